//! # easel_atelier
//!
//! Atelier - The component workshop for Easel.
//!
//! ## Name Origin
//!
//! An **atelier** is an artist's workshop, where raw sketches become finished
//! works. `easel_atelier` is where parsed component documents become live
//! instances: it fetches and registers definitions, runs extension hooks and
//! drives every instance through its lifecycle.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use easel_atelier::{EaselConfig, Extensions, MemoryFetcher, Runtime, StaticScripts};
//! use easel_relief::{Element, Namespace};
//!
//! let fetcher = MemoryFetcher::new().with_document(
//!     "/hello.html",
//!     r#"<property name="name" default="world"/><template><p>Hello {{name}}!</p></template>"#,
//! );
//! let runtime = Runtime::new(
//!     EaselConfig::default(),
//!     Extensions::new(),
//!     Rc::new(fetcher),
//!     Rc::new(StaticScripts::new()),
//! );
//!
//! let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! rt.block_on(runtime.load_component("x-hello", "/hello.html")).unwrap();
//!
//! let host = Element::new("x-hello", Namespace::Html);
//! let instance = runtime.construct("x-hello", host).unwrap();
//! instance.connect();
//! assert_eq!(instance.root().text_content(), "Hello world!");
//! ```

pub mod args;
pub mod config;
pub mod definition;
pub mod error;
pub mod extension;
pub mod fetch;
pub mod hooks;
pub mod instance;
pub mod property;
pub mod reactive;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod tasks;

pub use args::ComponentArgs;
pub use config::{ConfigError, DebugLevel, EaselConfig, CONFIG_FILE_NAME};
pub use definition::{ComponentDefinition, ScriptSource};
pub use error::{ConfigurationError, Error, HookError, Result};
pub use extension::{Capabilities, Extension, Extensions, Method, COMPONENTS_ARTIFACT};
pub use fetch::{DocumentFetcher, FetchError, FetchResponse, MemoryFetcher};
pub use hooks::{CleanupContext, ComponentHooks, HookPhase, HookPipeline, InitContext};
pub use instance::{
    ComponentInstance, InstanceId, LifecycleState, ATTRIBUTE_CHANGED_EVENT, CONNECTED_EVENT,
    DISCONNECTED_EVENT,
};
pub use property::{Properties, PropertyCell, PropertyType};
pub use reactive::ReactiveBinding;
pub use registry::Registry;
pub use runtime::{LoadRequest, Runtime};
pub use script::{Behavior, ScriptError, ScriptLoader, StaticScripts};
pub use tasks::BehaviorTasks;
