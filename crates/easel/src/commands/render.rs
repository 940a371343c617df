//! Render command - Load a component document and print one rendered instance

use async_trait::async_trait;
use clap::Args;
use easel_atelier::{
    DocumentFetcher, EaselConfig, Extensions, FetchError, FetchResponse, Runtime, StaticScripts,
};
use easel_relief::{Element, Namespace};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

#[derive(Args)]
pub struct RenderArgs {
    /// Component document to render
    pub file: PathBuf,

    /// Tag to register the component under (default: `x-<file stem>`)
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Host attribute, as `name=value` (repeatable)
    #[arg(short, long = "attr", value_parser = parse_key_value)]
    pub attrs: Vec<(String, String)>,

    /// Config file path (default: `easel.toml` next to the document)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override a config value, as `section.key=value` (repeatable)
    #[arg(long = "set", value_parser = parse_key_value)]
    pub overrides: Vec<(String, String)>,
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected `name=value`, got `{raw}`"))?;
    Ok((key.trim().to_string(), value.to_string()))
}

/// Serves component documents from a directory. URLs are resolved against
/// the directory, ignoring a leading `/`.
pub struct FsFetcher {
    base: PathBuf,
}

impl FsFetcher {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        self.base.join(url.trim_start_matches('/'))
    }
}

#[async_trait(?Send)]
impl DocumentFetcher for FsFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let path = self.resolve(url);
        tracing::debug!(url, path = %path.display(), "reading component");
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(FetchResponse::ok(content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(FetchResponse::not_found()),
            Err(err) => Err(FetchError::Transport {
                url: url.into(),
                message: err.to_string(),
            }),
        }
    }
}

fn default_tag(file: &Path) -> String {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if stem.contains('-') {
        stem
    } else {
        format!("x-{stem}")
    }
}

fn load_config(args: &RenderArgs, base: &Path) -> Result<EaselConfig, String> {
    let mut config = match &args.config {
        Some(path) => EaselConfig::load(path),
        None => EaselConfig::discover(base),
    }
    .map_err(|err| err.to_string())?;

    for (key, value) in &args.overrides {
        if !config.set(key, value).map_err(|err| err.to_string())? {
            return Err(format!("unknown config key `{key}`"));
        }
    }
    Ok(config)
}

pub fn run(args: RenderArgs) {
    let base = args
        .file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let config = match load_config(&args, &base) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading config: {}", err);
            std::process::exit(1);
        }
    };
    crate::logging::init(config.core.debug);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("Failed to create tokio runtime: {}", err);
            std::process::exit(1);
        }
    };

    match runtime.block_on(render(&args, config, FsFetcher::new(base))) {
        Ok(html) => println!("{html}"),
        Err(err) => {
            eprintln!("Error rendering {}: {}", args.file.display(), err);
            std::process::exit(1);
        }
    }
}

/// Load the document behind `args.file` and render one connected instance.
async fn render(
    args: &RenderArgs,
    config: EaselConfig,
    fetcher: FsFetcher,
) -> easel_atelier::Result<String> {
    let tag = args.tag.clone().unwrap_or_else(|| default_tag(&args.file));
    let url = args
        .file
        .file_name()
        .map(|name| format!("/{}", name.to_string_lossy()))
        .unwrap_or_default();

    let runtime = Runtime::new(
        config,
        Extensions::new(),
        Rc::new(fetcher),
        Rc::new(StaticScripts::new()),
    );
    runtime.require_component(&tag, &url).await?;

    let host = Element::new(tag.as_str(), Namespace::Html);
    for (name, value) in &args.attrs {
        host.set_attribute(name, value);
    }
    let instance = runtime.construct(&tag, host.clone())?;
    instance.connect();
    instance.settled().await;
    Ok(host.outer_html())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("title= Hi there").unwrap(),
            ("title".to_string(), " Hi there".to_string())
        );
        assert_eq!(
            parse_key_value("a=b=c").unwrap(),
            ("a".to_string(), "b=c".to_string())
        );
        assert!(parse_key_value("title").is_err());
    }

    #[test]
    fn test_default_tag() {
        assert_eq!(default_tag(Path::new("dir/Card.html")), "x-card");
        assert_eq!(default_tag(Path::new("user-badge.html")), "user-badge");
    }

    #[tokio::test]
    async fn test_fs_fetcher() {
        let base = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let fetcher = FsFetcher::new(&base);

        let found = fetcher.fetch("/Cargo.toml").await.unwrap();
        assert_eq!(found.status, 200);
        assert!(found.content.contains("name = \"easel\""));

        let missing = fetcher.fetch("/missing.html").await.unwrap();
        assert_eq!(missing.status, 404);
    }
}
