//! Extensions and the extension service.
//!
//! An [`Extension`] bundles named methods, named objects and artifacts. An
//! artifact is a typed value keyed by the module it targets; the component
//! runtime looks for [`COMPONENTS_ARTIFACT`] to find lifecycle hooks.

use easel_carton::{CompactString, FxHashMap};
use serde_json::Value;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ConfigurationError;
use crate::hooks::ComponentHooks;

/// Artifact key of component lifecycle hooks.
pub const COMPONENTS_ARTIFACT: &str = "@easel/components";

/// A method exposed to instances.
pub type Method = Rc<dyn Fn(&[Value]) -> Value>;

/// A named capability bundle.
pub struct Extension {
    name: CompactString,
    methods: Vec<(CompactString, Method)>,
    objects: Vec<(CompactString, Value)>,
    artifacts: FxHashMap<CompactString, Rc<dyn Any>>,
}

impl Extension {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
            objects: Vec::new(),
            artifacts: FxHashMap::default(),
        }
    }

    pub fn with_method(
        mut self,
        name: impl Into<CompactString>,
        method: impl Fn(&[Value]) -> Value + 'static,
    ) -> Self {
        self.methods.push((name.into(), Rc::new(method)));
        self
    }

    pub fn with_object(mut self, name: impl Into<CompactString>, value: Value) -> Self {
        self.objects.push((name.into(), value));
        self
    }

    /// Attach an artifact for `target`. Retrieve it with [`Extension::artifact`]
    /// using the same `T`.
    pub fn with_artifact<T: ?Sized + 'static>(
        mut self,
        target: impl Into<CompactString>,
        artifact: Rc<T>,
    ) -> Self {
        self.artifacts.insert(target.into(), Rc::new(artifact));
        self
    }

    /// Attach a component hook bundle.
    pub fn with_component_hooks(self, hooks: impl ComponentHooks + 'static) -> Self {
        let hooks: Rc<dyn ComponentHooks> = Rc::new(hooks);
        self.with_artifact(COMPONENTS_ARTIFACT, hooks)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &[(CompactString, Method)] {
        &self.methods
    }

    pub fn objects(&self) -> &[(CompactString, Value)] {
        &self.objects
    }

    pub fn artifact<T: ?Sized + 'static>(&self, target: &str) -> Option<Rc<T>> {
        let stored = self.artifacts.get(target)?.clone();
        stored.downcast::<Rc<T>>().ok().map(|inner| (*inner).clone())
    }
}

impl std::fmt::Debug for Extension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("methods", &self.methods.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("objects", &self.objects.iter().map(|(n, _)| n).collect::<Vec<_>>())
            .field("artifacts", &self.artifacts.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Merged methods and objects of every loaded extension.
#[derive(Clone, Default)]
pub struct Capabilities {
    methods: FxHashMap<CompactString, Method>,
    objects: FxHashMap<CompactString, Value>,
}

impl Capabilities {
    pub fn method(&self, name: &str) -> Option<Method> {
        self.methods.get(name).cloned()
    }

    /// Call a merged method.
    pub fn call(&self, name: &str, args: &[Value]) -> Option<Value> {
        self.methods.get(name).map(|method| method(args))
    }

    pub fn object(&self, name: &str) -> Option<&Value> {
        self.objects.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.methods.contains_key(name) || self.objects.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty() && self.objects.is_empty()
    }
}

impl std::fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Capabilities")
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("objects", &self.objects)
            .finish()
    }
}

/// The extension service. Cloning shares the same list.
#[derive(Clone, Default)]
pub struct Extensions {
    loaded: Rc<RefCell<Vec<Rc<Extension>>>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extension. A second extension with the same name is
    /// rejected and `false` is returned.
    pub fn add(&self, extension: Extension) -> bool {
        if self.has(extension.name()) {
            tracing::warn!(extension = extension.name(), "extension already loaded, skipping");
            return false;
        }
        tracing::debug!(extension = extension.name(), "extension loaded");
        self.loaded.borrow_mut().push(Rc::new(extension));
        true
    }

    pub fn get(&self, name: &str) -> Option<Rc<Extension>> {
        self.loaded
            .borrow()
            .iter()
            .find(|e| e.name() == name)
            .cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Fail unless every extension in `names` is loaded.
    pub fn require(&self, names: &[&str]) -> Result<(), ConfigurationError> {
        match names.iter().find(|name| !self.has(name)) {
            Some(name) => Err(ConfigurationError::MissingExtension {
                name: (*name).into(),
            }),
            None => Ok(()),
        }
    }

    /// Check that none of `names` is loaded yet. Violations are logged, not
    /// enforced; returns whether the ordering holds.
    pub fn before(&self, names: &[&str]) -> bool {
        let mut holds = true;
        for name in names.iter().filter(|name| self.has(name)) {
            tracing::error!(extension = *name, "extension must be loaded after this one");
            holds = false;
        }
        holds
    }

    /// Artifacts for `target`, in registration order, with their extension name.
    pub fn by_artifact<T: ?Sized + 'static>(&self, target: &str) -> Vec<(CompactString, Rc<T>)> {
        self.loaded
            .borrow()
            .iter()
            .filter_map(|e| Some((e.name.clone(), e.artifact::<T>(target)?)))
            .collect()
    }

    pub fn component_hooks(&self) -> Vec<(CompactString, Rc<dyn ComponentHooks>)> {
        self.by_artifact::<dyn ComponentHooks>(COMPONENTS_ARTIFACT)
    }

    pub fn all(&self) -> Vec<Rc<Extension>> {
        self.loaded.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.loaded.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.borrow().is_empty()
    }

    /// Merge methods and objects in registration order. The first extension to
    /// define a method keeps it; objects are overwritten by later extensions.
    pub fn capabilities(&self) -> Capabilities {
        let mut capabilities = Capabilities::default();
        for extension in self.loaded.borrow().iter() {
            for (name, method) in &extension.methods {
                if capabilities.methods.contains_key(name) {
                    tracing::warn!(
                        extension = extension.name(),
                        method = %name,
                        "extension method already defined, skipping"
                    );
                    continue;
                }
                capabilities.methods.insert(name.clone(), method.clone());
            }
            for (name, value) in &extension.objects {
                capabilities.objects.insert(name.clone(), value.clone());
            }
        }
        capabilities
    }
}

impl std::fmt::Debug for Extensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.loaded.borrow().iter()).finish()
    }
}
