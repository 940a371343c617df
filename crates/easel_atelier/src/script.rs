//! Behavior script resolution.
//!
//! A definition's `<script>` body is identified by its content hash. The
//! runtime never evaluates script text itself; a [`ScriptLoader`] maps a script
//! to a native [`Behavior`].

use async_trait::async_trait;
use easel_carton::{CompactString, FxHashMap};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

use crate::args::ComponentArgs;
use crate::definition::ScriptSource;

/// A component behavior: the default export of its script.
pub type Behavior = Rc<dyn Fn(&ComponentArgs)>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    #[error("script module {module} could not be resolved: {message}")]
    Resolve { module: String, message: String },
}

/// Resolves behavior scripts.
#[async_trait(?Send)]
pub trait ScriptLoader {
    /// Resolve the script of component `tag`. `Ok(None)` means the module has
    /// no default export.
    async fn load(&self, tag: &str, script: &ScriptSource) -> Result<Option<Behavior>, ScriptError>;
}

/// Behaviors registered up front, keyed by component tag.
#[derive(Default)]
pub struct StaticScripts {
    behaviors: RefCell<FxHashMap<CompactString, Behavior>>,
}

impl StaticScripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, tag: &str, behavior: impl Fn(&ComponentArgs) + 'static) -> Self {
        self.register(tag, behavior);
        self
    }

    pub fn register(&self, tag: &str, behavior: impl Fn(&ComponentArgs) + 'static) {
        self.behaviors
            .borrow_mut()
            .insert(tag.into(), Rc::new(behavior));
    }

    pub fn len(&self) -> usize {
        self.behaviors.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.behaviors.borrow().is_empty()
    }
}

impl std::fmt::Debug for StaticScripts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticScripts")
            .field("tags", &self.behaviors.borrow().keys().collect::<Vec<_>>())
            .finish()
    }
}

#[async_trait(?Send)]
impl ScriptLoader for StaticScripts {
    async fn load(&self, tag: &str, script: &ScriptSource) -> Result<Option<Behavior>, ScriptError> {
        tracing::debug!(component = tag, module = %script.module_id, "resolving behavior");
        Ok(self.behaviors.borrow().get(tag).cloned())
    }
}
