//! Component source documents.
//!
//! A component document is plain markup with up to four kinds of top-level
//! blocks:
//!
//! ```text
//! <template shadowless>...</template>
//! <script no-warn>...</script>
//! <style>...</style>
//! <property name="title" type="string" default="Untitled" attribute/>
//! ```
//!
//! Extraction is text based. Blocks are located with regular expressions and
//! only the template body goes through the tree parser.

use easel_carton::{CompactString, Lazy};
use easel_relief::{Attribute, Node};
use regex::Regex;

use crate::parser::parse;
use crate::tokenizer::scan_attributes;

static TEMPLATE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<template(\s[^>]*)?>(.*)</template>").expect("template block pattern")
});

static SCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<script(\s[^>]*)?>(.*?)</script>").expect("script block pattern")
});

static STYLE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<style(\s[^>]*)?>(.*?)</style>").expect("style block pattern")
});

static PROPERTY_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<property(\s[^>]*?)?/?>(\s*</property>)?").expect("property tag pattern")
});

/// Tag of property declarations.
pub const PROPERTY_TAG_NAME: &str = "property";
/// `rel` value of nested component imports.
pub const COMPONENT_LINK_REL: &str = "component";
/// Prefix of configuration meta tags.
pub const META_CONFIG_PREFIX: &str = "easel.";
/// Declared type used when a property names none.
pub const DEFAULT_PROPERTY_TYPE: &str = "string";

/// Behavior script block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock {
    pub body: String,
    /// Silence the missing-default-export warning
    pub no_warn: bool,
}

/// A `<property/>` declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyDecl {
    pub name: CompactString,
    pub type_tag: CompactString,
    pub default: Option<String>,
    pub required: bool,
    pub expose_to_styles: bool,
    pub attribute: bool,
}

impl PropertyDecl {
    /// Build a declaration from scanned attributes. Returns `None` without a
    /// `name`.
    pub fn from_attributes(attributes: &[Attribute]) -> Option<Self> {
        let find = |key: &str| attributes.iter().find(|a| a.name == key);
        let flag = |key: &str| {
            find(key).is_some_and(|a| a.value.as_deref().map_or(true, |v| v != "false"))
        };

        let name = find("name")?.value.clone().filter(|v| !v.is_empty())?;
        let type_tag = find("type")
            .and_then(|a| a.value.clone())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROPERTY_TYPE.into());

        Some(Self {
            name,
            type_tag,
            default: find("default").and_then(|a| a.value.as_deref().map(str::to_string)),
            required: flag("required"),
            expose_to_styles: flag("expose-to-styles"),
            attribute: flag("attribute"),
        })
    }
}

/// A `<link rel="component">` import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentLink {
    pub name: CompactString,
    pub href: String,
}

/// Everything extracted from one component document
#[derive(Debug, Clone)]
pub struct ComponentDocument {
    pub template: Node,
    pub shadowless: bool,
    pub script: Option<ScriptBlock>,
    pub style: Option<String>,
    pub properties: Vec<PropertyDecl>,
    pub imports: Vec<ComponentLink>,
}

fn has_flag(attributes: &str, flag: &str) -> bool {
    scan_attributes(attributes).iter().any(|a| a.name == flag)
}

/// Extract the blocks of a component document.
///
/// The template is the greedy `<template>` body; without one, the whole
/// document minus its script, style and property blocks is the template.
/// Property elements and component links are removed from the parsed template.
pub fn parse_document(source: &str) -> ComponentDocument {
    let (template_source, outside, shadowless) = match TEMPLATE_BLOCK.captures(source) {
        Some(captures) => {
            let whole = captures.get(0).map_or(0..0, |m| m.range());
            let attributes = captures.get(1).map_or("", |m| m.as_str());
            let body = captures.get(2).map_or("", |m| m.as_str()).to_string();
            let outside = format!("{}{}", &source[..whole.start], &source[whole.end..]);
            (body, outside, has_flag(attributes, "shadowless"))
        }
        None => {
            let stripped = SCRIPT_BLOCK.replace_all(source, "");
            let stripped = STYLE_BLOCK.replace_all(&stripped, "");
            let stripped = PROPERTY_TAG.replace_all(&stripped, "");
            (stripped.into_owned(), source.to_string(), false)
        }
    };

    let script = SCRIPT_BLOCK.captures_iter(&outside).find_map(|captures| {
        let attributes = captures.get(1).map_or("", |m| m.as_str());
        if has_flag(attributes, "src") {
            return None;
        }
        Some(ScriptBlock {
            body: captures.get(2).map_or("", |m| m.as_str()).trim().to_string(),
            no_warn: has_flag(attributes, "no-warn"),
        })
    });

    let style = STYLE_BLOCK
        .captures(&outside)
        .map(|captures| captures.get(2).map_or("", |m| m.as_str()).trim().to_string());

    let properties = PROPERTY_TAG
        .captures_iter(source)
        .filter_map(|captures| {
            let attributes = scan_attributes(captures.get(1).map_or("", |m| m.as_str()));
            PropertyDecl::from_attributes(&attributes)
        })
        .collect();

    let template = parse(&template_source);
    strip_elements(&template, |node| node.tag().as_deref() == Some(PROPERTY_TAG_NAME));
    let imports = component_links(&template);
    strip_elements(&template, is_component_link);

    ComponentDocument {
        template,
        shadowless,
        script,
        style,
        properties,
        imports,
    }
}

fn strip_elements(root: &Node, predicate: impl Fn(&Node) -> bool) {
    let matches: Vec<Node> = root.descendants().filter(|n| predicate(n)).collect();
    for node in matches {
        // Already detached when an ancestor matched first
        let _ = node.remove();
    }
}

fn attribute_value(node: &Node, name: &str) -> Option<CompactString> {
    node.attribute(name).and_then(|a| a.value)
}

fn is_component_link(node: &Node) -> bool {
    node.tag().as_deref() == Some("link")
        && attribute_value(node, "rel").as_deref() == Some(COMPONENT_LINK_REL)
}

/// Find `<link rel="component" name=".." href="..">` imports, in document order.
/// Links missing either attribute are skipped.
pub fn component_links(root: &Node) -> Vec<ComponentLink> {
    root.descendants()
        .filter(is_component_link)
        .filter_map(|node| {
            Some(ComponentLink {
                name: attribute_value(&node, "name")?,
                href: attribute_value(&node, "href")?.to_string(),
            })
        })
        .collect()
}

/// Collect `<meta name="easel.<path>" content="..">` pairs as `(path, value)`.
pub fn meta_config(root: &Node) -> Vec<(String, String)> {
    root.descendants()
        .filter(|node| node.tag().as_deref() == Some("meta"))
        .filter_map(|node| {
            let name = attribute_value(&node, "name")?;
            let path = name.strip_prefix(META_CONFIG_PREFIX)?;
            let content = attribute_value(&node, "content").unwrap_or_default();
            Some((path.to_string(), content.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CARD: &str = r#"
<property name="title" default="Untitled" attribute required/>
<property name="count" type="number" default="0" expose-to-styles/>
<template>
  <link rel="component" name="x-icon" href="/icon.html">
  <h1>{{ title }}</h1>
  <x-icon></x-icon>
</template>
<script src="/vendor.js"></script>
<script no-warn>
  export default function () {}
</script>
<style>h1 { color: red; }</style>
"#;

    #[test]
    fn test_parse_document_blocks() {
        let doc = parse_document(CARD);
        insta::assert_snapshot!(doc.template.to_string(), @"<h1>{{ title }}</h1><x-icon></x-icon>");
        assert!(!doc.shadowless);

        let script = doc.script.unwrap();
        assert!(script.no_warn);
        assert_eq!(script.body, "export default function () {}");
        assert_eq!(doc.style.as_deref(), Some("h1 { color: red; }"));
        assert_eq!(
            doc.imports,
            vec![ComponentLink {
                name: "x-icon".into(),
                href: "/icon.html".into()
            }]
        );
    }

    #[test]
    fn test_parse_document_properties() {
        let doc = parse_document(CARD);
        assert_eq!(doc.properties.len(), 2);

        let title = &doc.properties[0];
        assert_eq!(title.name, "title");
        assert_eq!(title.type_tag, "string");
        assert_eq!(title.default.as_deref(), Some("Untitled"));
        assert!(title.required && title.attribute && !title.expose_to_styles);

        let count = &doc.properties[1];
        assert_eq!(count.type_tag, "number");
        assert!(count.expose_to_styles && !count.required && !count.attribute);
    }

    #[test]
    fn test_required_false_is_not_required() {
        let doc = parse_document(r#"<property name="a" required="false"/><template></template>"#);
        assert!(!doc.properties[0].required);
    }

    #[test]
    fn test_property_without_name_is_skipped() {
        let doc = parse_document(r#"<property type="number"/><template>x</template>"#);
        assert!(doc.properties.is_empty());
    }

    #[test]
    fn test_document_without_template() {
        let doc = parse_document(
            r#"<property name="who"/><p>Hello {{who}}</p><script>run()</script><style>p{}</style>"#,
        );
        insta::assert_snapshot!(doc.template.to_string(), @"<p>Hello {{who}}</p>");
        assert_eq!(doc.script.unwrap().body, "run()");
        assert_eq!(doc.properties[0].name, "who");
    }

    #[test]
    fn test_shadowless_template() {
        let doc = parse_document("<template shadowless><b>x</b></template>");
        assert!(doc.shadowless);
        assert!(doc.script.is_none());
        assert!(doc.style.is_none());
    }

    #[test]
    fn test_property_inside_template_removed() {
        let doc = parse_document(r#"<template><property name="a"/><i>y</i></template>"#);
        insta::assert_snapshot!(doc.template.to_string(), @"<i>y</i>");
        assert_eq!(doc.properties.len(), 1);
    }

    #[test]
    fn test_meta_config() {
        let page = parse(
            r#"<head><meta name="easel.core.debug" content="verbose"><meta name="viewport" content="x"><meta name="easel.inject.name" content="$$"></head>"#,
        );
        assert_eq!(
            meta_config(&page),
            vec![
                ("core.debug".to_string(), "verbose".to_string()),
                ("inject.name".to_string(), "$$".to_string()),
            ]
        );
    }

    #[test]
    fn test_component_links_skip_incomplete() {
        let page = parse(
            r#"<link rel="component" name="a-b" href="/a.html"><link rel="component" name="c-d"><link rel="stylesheet" href="/s.css">"#,
        );
        let links = component_links(&page);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name, "a-b");
    }
}
