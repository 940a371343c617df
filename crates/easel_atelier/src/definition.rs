//! Component definitions.

use easel_armature::{ComponentDocument, ComponentLink, PropertyDecl, ScriptBlock};
use easel_carton::{hash::module_id, CompactString};
use easel_relief::Node;

/// Behavior script of a definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSource {
    pub body: String,
    pub no_warn: bool,
    /// Content-hash identifier the script loader resolves
    pub module_id: String,
}

impl ScriptSource {
    pub fn new(body: impl Into<String>, no_warn: bool) -> Self {
        let body = body.into();
        Self {
            module_id: module_id(&body),
            body,
            no_warn,
        }
    }
}

impl From<ScriptBlock> for ScriptSource {
    fn from(block: ScriptBlock) -> Self {
        Self::new(block.body, block.no_warn)
    }
}

/// Cached, shared template and metadata of one component tag.
///
/// The template is only ever cloned once the definition is registered.
#[derive(Debug, Clone)]
pub struct ComponentDefinition {
    pub tag: CompactString,
    pub source_url: String,
    pub template: Node,
    pub script: Option<ScriptSource>,
    pub style: Option<String>,
    pub properties: Vec<PropertyDecl>,
    /// Render into the host instead of a shadow root
    pub shadowless: bool,
    /// Nested components pulled in by `<link rel="component">`
    pub imports: Vec<ComponentLink>,
}

impl ComponentDefinition {
    pub fn from_document(
        tag: impl Into<CompactString>,
        source_url: impl Into<String>,
        document: ComponentDocument,
    ) -> Self {
        Self {
            tag: tag.into(),
            source_url: source_url.into(),
            template: document.template,
            script: document.script.map(ScriptSource::from),
            style: document.style,
            properties: document.properties,
            shadowless: document.shadowless,
            imports: document.imports,
        }
    }

    /// Build a definition straight from component markup.
    pub fn parse(tag: impl Into<CompactString>, source_url: impl Into<String>, source: &str) -> Self {
        Self::from_document(tag, source_url, easel_armature::parse_document(source))
    }

    pub fn property(&self, name: &str) -> Option<&PropertyDecl> {
        self.properties.iter().find(|p| p.name == name)
    }
}
