//! Parse command - Print the tree or document blocks of a markup file

use clap::Args;
use easel_armature::{parse, parse_document, ComponentDocument};
use serde_json::{json, Value};
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct ParseArgs {
    /// Markup file to parse
    pub file: PathBuf,

    /// Treat the file as a component document and print its blocks as JSON
    #[arg(short, long)]
    pub document: bool,
}

pub fn run(args: ParseArgs) {
    crate::logging::init(Default::default());

    let source = match fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading {}: {}", args.file.display(), err);
            std::process::exit(1);
        }
    };

    if args.document {
        let document = parse_document(&source);
        match serde_json::to_string_pretty(&document_json(&document)) {
            Ok(out) => println!("{out}"),
            Err(err) => {
                eprintln!("Error serializing {}: {}", args.file.display(), err);
                std::process::exit(1);
            }
        }
    } else {
        println!("{}", parse(&source));
    }
}

fn document_json(document: &ComponentDocument) -> Value {
    let properties: Vec<Value> = document
        .properties
        .iter()
        .map(|p| {
            json!({
                "name": p.name.as_str(),
                "type": p.type_tag.as_str(),
                "default": p.default,
                "required": p.required,
                "attribute": p.attribute,
                "exposeToStyles": p.expose_to_styles,
            })
        })
        .collect();
    let imports: Vec<Value> = document
        .imports
        .iter()
        .map(|link| json!({ "name": link.name.as_str(), "href": link.href }))
        .collect();

    json!({
        "template": document.template.to_string(),
        "shadowless": document.shadowless,
        "script": document.script.as_ref().map(|s| json!({ "body": s.body, "noWarn": s.no_warn })),
        "style": document.style,
        "properties": properties,
        "imports": imports,
    })
}
