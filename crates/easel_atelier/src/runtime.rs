//! Runtime wiring.
//!
//! [`Runtime`] owns the services a page needs (configuration, extensions,
//! registry, script loader) and is the entry point the presentation host
//! drives: load components, construct instances, then connect and disconnect
//! them. Behavior scripts queued by connects run while the runtime's task set
//! is driven.

use easel_carton::{CompactString, FxHashSet};
use easel_relief::Element;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::config::EaselConfig;
use crate::definition::ComponentDefinition;
use crate::error::{ConfigurationError, Error, Result};
use crate::extension::Extensions;
use crate::fetch::{DocumentFetcher, FetchError};
use crate::hooks::HookPipeline;
use crate::instance::{ComponentInstance, InstanceId, LifecycleServices};
use crate::registry::Registry;
use crate::script::ScriptLoader;
use crate::tasks::BehaviorTasks;

/// Request to load a component, raised through [`Runtime::load_signal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRequest {
    pub tag: CompactString,
    pub url: String,
}

impl LoadRequest {
    pub fn new(tag: impl Into<CompactString>, url: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            url: url.into(),
        }
    }
}

type LoadedListener = Rc<dyn Fn(&Rc<ComponentDefinition>)>;

pub struct Runtime {
    config: Rc<EaselConfig>,
    extensions: Extensions,
    hooks: HookPipeline,
    registry: Registry,
    scripts: Rc<dyn ScriptLoader>,
    tasks: Rc<BehaviorTasks>,
    loaded_listeners: RefCell<Vec<LoadedListener>>,
    load_tx: UnboundedSender<LoadRequest>,
    load_rx: RefCell<Option<UnboundedReceiver<LoadRequest>>>,
    next_instance: Cell<u64>,
}

impl Runtime {
    pub fn new(
        config: EaselConfig,
        extensions: Extensions,
        fetcher: Rc<dyn DocumentFetcher>,
        scripts: Rc<dyn ScriptLoader>,
    ) -> Self {
        let hooks = HookPipeline::new(extensions.clone());
        let registry = Registry::new(fetcher, hooks.clone());
        let (load_tx, load_rx) = mpsc::unbounded_channel();
        tracing::debug!(debug = ?config.core.debug, inject = %config.inject.name, "runtime created");
        Self {
            config: Rc::new(config),
            extensions,
            hooks,
            registry,
            scripts,
            tasks: Rc::new(BehaviorTasks::new()),
            loaded_listeners: RefCell::new(Vec::new()),
            load_tx,
            load_rx: RefCell::new(Some(load_rx)),
            next_instance: Cell::new(0),
        }
    }

    pub fn config(&self) -> &EaselConfig {
        &self.config
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn hooks(&self) -> &HookPipeline {
        &self.hooks
    }

    pub fn tasks(&self) -> &BehaviorTasks {
        &self.tasks
    }

    /// Run `future` while driving the behaviors of connected instances.
    pub async fn run_until<F: Future>(&self, future: F) -> F::Output {
        self.tasks.run_until(future).await
    }

    /// Call `listener` after every successful [`Runtime::load_component`].
    pub fn on_component_loaded(&self, listener: impl Fn(&Rc<ComponentDefinition>) + 'static) {
        self.loaded_listeners.borrow_mut().push(Rc::new(listener));
    }

    fn notify_loaded(&self, definition: &Rc<ComponentDefinition>) {
        let listeners = self.loaded_listeners.borrow().clone();
        for listener in listeners {
            listener(definition);
        }
    }

    fn validate_tag(&self, tag: &str) -> Result<()> {
        if self.config.components.require_separator && !tag.contains('-') {
            return Err(ConfigurationError::MissingSeparator { tag: tag.into() }.into());
        }
        Ok(())
    }

    /// Fetch and register `tag` from `url`, then every component it imports.
    ///
    /// Returns the definition of `tag`, or `None` when it could not be
    /// fetched. Import failures are logged and do not fail the root load.
    pub async fn load_component(
        &self,
        tag: &str,
        url: &str,
    ) -> Result<Option<Rc<ComponentDefinition>>> {
        self.validate_tag(tag)?;
        let Some(definition) = self.load_one(tag, url).await? else {
            return Ok(None);
        };

        let mut visited: FxHashSet<CompactString> = FxHashSet::default();
        visited.insert(definition.tag.clone());
        let mut pending: VecDeque<_> = definition.imports.iter().cloned().collect();
        while let Some(link) = pending.pop_front() {
            if !visited.insert(link.name.clone()) {
                continue;
            }
            let loaded = match self.validate_tag(&link.name) {
                Ok(()) => self.load_one(&link.name, &link.href).await,
                Err(err) => Err(err),
            };
            match loaded {
                Ok(Some(import)) => pending.extend(import.imports.iter().cloned()),
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(component = tag, import = %link.name, %err, "import failed")
                }
            }
        }
        Ok(Some(definition))
    }

    async fn load_one(&self, tag: &str, url: &str) -> Result<Option<Rc<ComponentDefinition>>> {
        let known = self.registry.contains(tag);
        let definition = self.registry.fetch_definition(tag, url).await?;
        if let Some(definition) = &definition {
            if !known {
                self.notify_loaded(definition);
            }
        }
        Ok(definition)
    }

    /// Like [`Runtime::load_component`], but a missing definition is an error.
    pub async fn require_component(&self, tag: &str, url: &str) -> Result<Rc<ComponentDefinition>> {
        self.load_component(tag, url).await?.ok_or_else(|| {
            Error::Fetch(FetchError::Unavailable {
                tag: tag.into(),
                url: url.into(),
            })
        })
    }

    /// Sender for load requests; see [`Runtime::serve_load_requests`].
    pub fn load_signal(&self) -> UnboundedSender<LoadRequest> {
        self.load_tx.clone()
    }

    /// Serve every load request queued so far. Returns how many were served.
    pub async fn serve_load_requests(&self) -> usize {
        let Some(mut receiver) = self.load_rx.borrow_mut().take() else {
            tracing::warn!("load requests are already being served");
            return 0;
        };
        let mut served = 0;
        while let Ok(request) = receiver.try_recv() {
            served += 1;
            if let Err(err) = self.load_component(&request.tag, &request.url).await {
                tracing::error!(component = %request.tag, %err, "load request failed");
            }
        }
        *self.load_rx.borrow_mut() = Some(receiver);
        served
    }

    /// Construct an instance of a registered component on `host`.
    pub fn construct(&self, tag: &str, host: Element) -> Result<ComponentInstance> {
        let definition = self
            .registry
            .get(tag)
            .ok_or_else(|| Error::UnknownComponent(tag.into()))?;
        let id = InstanceId(self.next_instance.get());
        self.next_instance.set(id.0 + 1);

        ComponentInstance::construct(
            id,
            definition,
            host,
            self.extensions.capabilities(),
            LifecycleServices {
                hooks: self.hooks.clone(),
                scripts: self.scripts.clone(),
                config: self.config.clone(),
                tasks: Rc::downgrade(&self.tasks),
            },
        )
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("extensions", &self.extensions)
            .field("registry", &self.registry)
            .finish()
    }
}
