//! Component instances and their lifecycle.
//!
//! ```text
//! Unconstructed --construct--> Constructed --connect--> Connected
//!                                                        |     ^
//!                                             disconnect |     | connect
//!                                                        v     |
//!                                                     Disconnected
//! ```
//!
//! Construction clones the definition's template and initializes properties.
//! Connecting materializes the clone once, binds placeholders, wires property
//! watchers, runs `on_init` hooks and schedules the behavior script.
//! Disconnecting undoes the watchers, hooks, bindings and tracked listeners;
//! reconnecting repeats the connect steps on the same clone, so property
//! values survive.
//!
//! Attribute reflection and the exposed host style follow their properties
//! for the whole life of the instance, connected or not.
//!
//! Behavior scripts are queued on the runtime's [`BehaviorTasks`] and run the
//! next time it is driven, through [`ComponentInstance::settled`] or
//! [`crate::Runtime::run_until`].

use easel_carton::{live, CompactString, FxHashMap, Live};
use easel_croquis::{placeholder_keys, render_value, Bindings, RxMap};
use easel_relief::{Element, Event, Listener, Namespace, Node};
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tokio::task::JoinHandle;

use crate::args::ComponentArgs;
use crate::config::EaselConfig;
use crate::definition::{ComponentDefinition, ScriptSource};
use crate::error::{ConfigurationError, Result};
use crate::extension::Capabilities;
use crate::hooks::{HookPipeline, InitContext};
use crate::property::{Properties, PropertyCell};
use crate::script::ScriptLoader;
use crate::tasks::BehaviorTasks;

/// Event dispatched on the root when an instance connects.
pub const CONNECTED_EVENT: &str = "connected";
/// Event dispatched on the root when an instance disconnects.
pub const DISCONNECTED_EVENT: &str = "disconnected";
/// Event dispatched on the root when the host reports an attribute change.
pub const ATTRIBUTE_CHANGED_EVENT: &str = "attributeChanged";

/// Identifies an instance for per-instance state kept by hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    Connected,
    Disconnected,
}

/// Collaborators an instance needs after construction.
#[derive(Clone)]
pub struct LifecycleServices {
    pub hooks: HookPipeline,
    pub scripts: Rc<dyn ScriptLoader>,
    pub config: Rc<EaselConfig>,
    pub tasks: Weak<BehaviorTasks>,
}

struct InstanceInner {
    id: InstanceId,
    definition: Rc<ComponentDefinition>,
    tree: Node,
    host: Element,
    root: Element,
    properties: Properties,
    attributes: RefCell<FxHashMap<CompactString, CompactString>>,
    capabilities: Capabilities,
    listeners: RefCell<Vec<(CompactString, Listener)>>,
    rx: RefCell<RxMap>,
    bindings: RefCell<Bindings>,
    // Set while a host attribute change is written into its property
    syncing_from_host: Cell<bool>,
    state: Cell<LifecycleState>,
    materialized: Cell<bool>,
    host_style: Option<Element>,
    behavior: RefCell<Option<JoinHandle<()>>>,
    services: LifecycleServices,
}

/// One live instance of a component. Cloning shares the instance.
#[derive(Clone)]
pub struct ComponentInstance(Rc<InstanceInner>);

fn reflect_attribute(host: &Element, name: &str, value: &Value) {
    match value {
        Value::Null | Value::Bool(false) => {
            host.remove_attribute(name);
        }
        Value::Bool(true) => host.set_attribute(name, ""),
        other => host.set_attribute(name, &render_value(other)),
    }
}

impl ComponentInstance {
    /// Construct an instance of `definition` on `host`.
    ///
    /// Fails when a required attribute-backed property has no host attribute,
    /// or, with strict placeholders, when the template uses an undeclared key.
    /// Nothing is bound and no hook runs before these checks pass.
    pub fn construct(
        id: InstanceId,
        definition: Rc<ComponentDefinition>,
        host: Element,
        capabilities: Capabilities,
        services: LifecycleServices,
    ) -> Result<Self> {
        let tag = definition.tag.clone();
        let attributes: FxHashMap<CompactString, CompactString> =
            host.attributes().into_iter().collect();

        let mut properties = Properties::default();
        for decl in &definition.properties {
            let from_host = if decl.attribute {
                attributes.get(&decl.name).map(|v| v.as_str())
            } else {
                None
            };
            if decl.required && decl.attribute && from_host.is_none() {
                return Err(ConfigurationError::MissingRequiredAttribute {
                    tag,
                    property: decl.name.clone(),
                }
                .into());
            }
            let cell = PropertyCell::new(decl.clone(), Value::Null);
            cell.set_raw(from_host);
            properties.push(cell);
        }

        if services.config.components.strict_placeholders {
            if let Some(key) = placeholder_keys(&definition.template)
                .into_iter()
                .find(|key| !properties.contains(key))
            {
                return Err(ConfigurationError::UndeclaredPlaceholder { tag, key }.into());
            }
        }

        let tree = definition.template.deep_clone();
        let root = if definition.shadowless {
            host.clone()
        } else {
            host.attach_shadow()
        };

        if let Some(style) = &definition.style {
            let element = Element::new("style", Namespace::Html);
            element.append_child(&Element::text(style.as_str()));
            root.append_child(&element);
        }
        let host_style = properties.host_style().map(|css| {
            let element = Element::new("style", Namespace::Html);
            element.append_child(&Element::text(css));
            root.append_child(&element);
            element
        });

        for cell in properties.iter().filter(|c| c.decl().attribute) {
            if !host.has_attribute(cell.name()) {
                reflect_attribute(&host, cell.name(), &cell.get());
            }
        }

        tracing::debug!(component = %tag, instance = id.0, "constructed");
        let instance = Self(Rc::new(InstanceInner {
            id,
            definition,
            tree,
            host,
            root,
            properties,
            attributes: RefCell::new(attributes),
            capabilities,
            listeners: RefCell::new(Vec::new()),
            rx: RefCell::new(RxMap::default()),
            bindings: RefCell::new(Bindings::default()),
            syncing_from_host: Cell::new(false),
            state: Cell::new(LifecycleState::Constructed),
            materialized: Cell::new(false),
            host_style,
            behavior: RefCell::new(None),
            services,
        }));
        instance.wire_host_channels();
        Ok(instance)
    }

    pub fn id(&self) -> InstanceId {
        self.0.id
    }

    pub fn tag(&self) -> &str {
        &self.0.definition.tag
    }

    pub fn definition(&self) -> &Rc<ComponentDefinition> {
        &self.0.definition
    }

    /// The private template clone.
    pub fn tree(&self) -> &Node {
        &self.0.tree
    }

    pub fn host(&self) -> &Element {
        &self.0.host
    }

    pub fn root(&self) -> &Element {
        &self.0.root
    }

    pub fn properties(&self) -> &Properties {
        &self.0.properties
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.0.capabilities
    }

    pub fn state(&self) -> LifecycleState {
        self.0.state.get()
    }

    pub fn is_mounted(&self) -> bool {
        self.state() == LifecycleState::Connected
    }

    pub fn attributes(&self) -> FxHashMap<CompactString, CompactString> {
        self.0.attributes.borrow().clone()
    }

    pub fn attribute(&self, name: &str) -> Option<CompactString> {
        self.0.attributes.borrow().get(name).cloned()
    }

    pub fn args(&self) -> ComponentArgs {
        ComponentArgs::new(self.clone())
    }

    pub(crate) fn inject_name(&self) -> &str {
        &self.0.services.config.inject.name
    }

    /// Run `f` with the instance's reactive values.
    pub fn with_rx<R>(&self, f: impl FnOnce(&mut RxMap) -> R) -> R {
        f(&mut self.0.rx.borrow_mut())
    }

    pub fn rx_value(&self, key: &str) -> Option<Live<Value>> {
        self.0.rx.borrow().get(key).cloned()
    }

    /// Number of placeholder bindings currently live.
    pub fn binding_count(&self) -> usize {
        self.0.bindings.borrow().len()
    }

    /// Replace the placeholder bindings. The previous set is released.
    pub(crate) fn set_bindings(&self, bindings: Bindings) {
        let previous = self.0.bindings.replace(bindings);
        drop(previous);
    }

    pub(crate) fn release_bindings(&self) {
        self.0.bindings.borrow_mut().release();
    }

    /// Number of listeners registered through the args surface.
    pub fn tracked_listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    pub(crate) fn track_listener(&self, event: &str, listener: Listener) {
        self.0.root.add_event_listener(event, listener.clone());
        self.0.listeners.borrow_mut().push((event.into(), listener));
    }

    pub(crate) fn untrack_listener(&self, event: &str, listener: &Listener) -> bool {
        let mut listeners = self.0.listeners.borrow_mut();
        let before = listeners.len();
        listeners.retain(|(name, l)| !(name.as_str() == event && Rc::ptr_eq(l, listener)));
        let removed = listeners.len() != before;
        drop(listeners);
        if removed {
            self.0.root.remove_event_listener(event, listener);
        }
        removed
    }

    fn dispatch(&self, event: Event) {
        self.0.root.dispatch_event(&event);
    }

    fn refresh_host_style(&self) {
        if let (Some(element), Some(css)) = (&self.0.host_style, self.0.properties.host_style()) {
            element.set_text_content(&css);
        }
    }

    fn weak(&self) -> Weak<InstanceInner> {
        Rc::downgrade(&self.0)
    }

    /// Subscribe host reflection and the exposed style to their properties.
    /// These live on the property values themselves, so
    /// [`Properties::unwatch_all`] leaves them in place.
    fn wire_host_channels(&self) {
        for cell in self.0.properties.iter() {
            if cell.decl().attribute {
                let weak = self.weak();
                let name = cell.decl().name.clone();
                cell.live().subscribe(Rc::new(move |_: &Value, next: &Value| {
                    if let Some(inner) = weak.upgrade() {
                        if !inner.syncing_from_host.get() {
                            reflect_attribute(&inner.host, &name, next);
                        }
                    }
                }));
            }

            if cell.decl().expose_to_styles {
                let weak = self.weak();
                cell.live().subscribe(Rc::new(move |_: &Value, _: &Value| {
                    if let Some(inner) = weak.upgrade() {
                        ComponentInstance(inner).refresh_host_style();
                    }
                }));
            }
        }
    }

    /// Install the per-connection property watchers. Each property seeds and
    /// then drives the reactive value of the same name.
    fn wire_properties(&self) {
        for cell in self.0.properties.iter() {
            let value = self.with_rx(|rx| {
                rx.entry(cell.name().into())
                    .or_insert_with(|| live(Value::Null))
                    .clone()
            });
            value.set(cell.get());
            cell.watch(Rc::new(move |_: &Value, next: &Value| value.set(next.clone())));
        }
    }

    /// Mount the instance. Does nothing when already connected.
    pub fn connect(&self) {
        if self.is_mounted() {
            tracing::debug!(component = self.tag(), "already connected");
            return;
        }

        if !self.0.materialized.get() {
            for child in self.0.tree.children() {
                self.0.root.append_child(&child.html_node());
            }
            self.0.materialized.set(true);
        }

        let args = self.args();
        let ctx = InitContext {
            root: &self.0.root,
            args: &args,
            instance: self,
        };
        let hooks = &self.0.services.hooks;
        hooks.init_builtin(&ctx);
        self.wire_properties();
        hooks.init_extensions(&ctx);

        self.0.state.set(LifecycleState::Connected);
        self.dispatch(Event::new(CONNECTED_EVENT));
        if let Some(script) = &self.0.definition.script {
            self.spawn_behavior(script.clone());
        }
        tracing::debug!(component = self.tag(), instance = self.0.id.0, "connected");
    }

    fn spawn_behavior(&self, script: ScriptSource) {
        let Some(tasks) = self.0.services.tasks.upgrade() else {
            tracing::warn!(component = self.tag(), "runtime is gone; behavior not scheduled");
            return;
        };
        let instance = self.clone();
        let handle = tasks.spawn(async move {
            instance.run_behavior(&script).await;
        });
        if let Some(previous) = self.0.behavior.borrow_mut().replace(handle) {
            // A reconnect before the previous script resolved
            previous.abort();
        }
    }

    async fn run_behavior(&self, script: &ScriptSource) {
        let scripts = self.0.services.scripts.clone();
        let behavior = match scripts.load(self.tag(), script).await {
            Ok(Some(behavior)) => behavior,
            Ok(None) => {
                if !script.no_warn {
                    tracing::warn!(
                        component = self.tag(),
                        "script has no default export; add `no-warn` to the script tag if intended"
                    );
                }
                return;
            }
            Err(err) => {
                tracing::warn!(component = self.tag(), %err, "behavior script failed to load");
                return;
            }
        };

        if !self.is_mounted() {
            tracing::debug!(component = self.tag(), "disconnected before behavior ran");
            return;
        }
        behavior(&self.args());
        self.dispatch(Event::new(CONNECTED_EVENT));
    }

    /// Wait for the behavior scheduled by the last connect, if any, driving
    /// the runtime's tasks meanwhile.
    pub async fn settled(&self) {
        let handle = self.0.behavior.borrow_mut().take();
        if let Some(handle) = handle {
            let outcome = match self.0.services.tasks.upgrade() {
                Some(tasks) => tasks.run_until(handle).await,
                // Dropping the task set cancels what it held
                None => handle.await,
            };
            if let Err(err) = outcome {
                if !err.is_cancelled() {
                    tracing::error!(component = self.tag(), %err, "behavior task failed");
                }
            }
        }
    }

    /// Unmount the instance. Does nothing unless connected.
    pub fn disconnect(&self) {
        if !self.is_mounted() {
            return;
        }
        self.0.state.set(LifecycleState::Disconnected);
        self.0.properties.unwatch_all();

        let args = self.args();
        let ctx = InitContext {
            root: &self.0.root,
            args: &args,
            instance: self,
        };
        self.0.services.hooks.cleanup(&ctx);

        let listeners = std::mem::take(&mut *self.0.listeners.borrow_mut());
        for (event, listener) in &listeners {
            self.0.root.remove_event_listener(event, listener);
        }
        self.dispatch(Event::new(DISCONNECTED_EVENT));
        tracing::debug!(component = self.tag(), instance = self.0.id.0, "disconnected");
    }

    /// The host changed (or removed, with `None`) an attribute.
    pub fn attribute_changed(&self, name: &str, value: Option<&str>) {
        let old = {
            let mut attributes = self.0.attributes.borrow_mut();
            match value {
                Some(value) => attributes.insert(name.into(), value.into()),
                None => attributes.remove(name),
            }
        };

        if let Some(cell) = self
            .0
            .properties
            .iter()
            .find(|c| c.decl().attribute && c.name() == name)
        {
            // The host already holds the new state, including removal
            self.0.syncing_from_host.set(true);
            cell.set_raw(value);
            self.0.syncing_from_host.set(false);
        }

        self.dispatch(Event::with_detail(
            ATTRIBUTE_CHANGED_EVENT,
            json!({
                "name": name,
                "oldValue": old.as_deref(),
                "newValue": value,
            }),
        ));
    }
}

impl std::fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.0.id)
            .field("tag", &self.0.definition.tag)
            .field("state", &self.0.state.get())
            .field("properties", &self.0.properties)
            .finish()
    }
}
