//! The args surface handed to hooks and behaviors.

use easel_carton::{live, CompactString, FxHashMap, Live};
use easel_relief::{Element, Listener};
use serde_json::Value;

use crate::extension::Capabilities;
use crate::instance::ComponentInstance;
use crate::property::Properties;

/// Live view of one instance. Several names are aliases of each other
/// (`elements`/`el`, `attributes`/`attr`, `extensions`/`ext`).
#[derive(Clone, Debug)]
pub struct ComponentArgs {
    instance: ComponentInstance,
}

impl ComponentArgs {
    pub(crate) fn new(instance: ComponentInstance) -> Self {
        Self { instance }
    }

    pub fn instance(&self) -> &ComponentInstance {
        &self.instance
    }

    /// The root scope: a shadow root, or the host for shadowless components.
    pub fn root(&self) -> Element {
        self.instance.root().clone()
    }

    /// Elements under the root that carry an `id`.
    pub fn elements(&self) -> FxHashMap<CompactString, Element> {
        self.instance.root().elements_with_id().into_iter().collect()
    }

    pub fn el(&self, id: &str) -> Option<Element> {
        self.instance
            .root()
            .elements_with_id()
            .into_iter()
            .find_map(|(key, element)| (key == id).then_some(element))
    }

    pub fn properties(&self) -> &Properties {
        self.instance.properties()
    }

    pub fn property(&self, name: &str) -> Option<Value> {
        self.properties().get(name).map(|cell| cell.get())
    }

    /// Write a property. Returns `false` for undeclared names.
    pub fn set_property(&self, name: &str, value: Value) -> bool {
        match self.properties().get(name) {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    pub fn attributes(&self) -> FxHashMap<CompactString, CompactString> {
        self.instance.attributes()
    }

    pub fn attr(&self, name: &str) -> Option<CompactString> {
        self.instance.attribute(name)
    }

    pub fn extensions(&self) -> &Capabilities {
        self.instance.capabilities()
    }

    pub fn ext(&self) -> &Capabilities {
        self.extensions()
    }

    /// The capability surface, when `key` is the configured injection name.
    pub fn injected(&self, key: &str) -> Option<&Capabilities> {
        (key == self.instance.inject_name()).then(|| self.extensions())
    }

    /// The reactive value behind `{{ key }}`, created as `null` when missing.
    pub fn rx(&self, key: &str) -> Live<Value> {
        self.instance
            .with_rx(|rx| rx.entry(key.into()).or_insert_with(|| live(Value::Null)).clone())
    }

    /// Listen on the root; removed automatically on disconnect.
    pub fn listen(&self, event: &str, listener: Listener) {
        self.instance.track_listener(event, listener);
    }

    pub fn unlisten(&self, event: &str, listener: &Listener) -> bool {
        self.instance.untrack_listener(event, listener)
    }
}
