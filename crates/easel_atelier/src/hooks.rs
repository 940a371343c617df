//! Component lifecycle hooks.
//!
//! Hooks run in a fixed order: the built-in reactive binding stage first, then
//! every extension carrying a [`COMPONENTS_ARTIFACT`](crate::COMPONENTS_ARTIFACT)
//! bundle, in registration order. A failing hook is logged with its extension
//! name and phase; the remaining hooks still run.

use easel_carton::CompactString;
use easel_relief::Element;
use std::fmt;
use std::rc::Rc;

use crate::args::ComponentArgs;
use crate::definition::ComponentDefinition;
use crate::error::HookError;
use crate::extension::Extensions;
use crate::instance::ComponentInstance;
use crate::reactive::ReactiveBinding;

/// What a hook sees of an instance.
pub struct InitContext<'a> {
    pub root: &'a Element,
    pub args: &'a ComponentArgs,
    pub instance: &'a ComponentInstance,
}

/// Cleanup sees the same surface as init.
pub type CleanupContext<'a> = InitContext<'a>;

/// Hook bundle for the component runtime. Every method defaults to a no-op.
pub trait ComponentHooks {
    /// A definition was fetched and parsed, and is about to be registered.
    fn on_fetch_component(&self, _definition: &ComponentDefinition) -> Result<(), HookError> {
        Ok(())
    }

    /// An instance connected; properties and bindings are live.
    fn on_init(&self, _ctx: &InitContext<'_>) -> Result<(), HookError> {
        Ok(())
    }

    /// An instance disconnected.
    fn on_cleanup(&self, _ctx: &CleanupContext<'_>) -> Result<(), HookError> {
        Ok(())
    }
}

/// Lifecycle phase a hook ran in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Fetch,
    Init,
    Cleanup,
}

impl HookPhase {
    pub const fn as_str(self) -> &'static str {
        match self {
            HookPhase::Fetch => "fetch",
            HookPhase::Init => "init",
            HookPhase::Cleanup => "cleanup",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered hook dispatch.
#[derive(Clone)]
pub struct HookPipeline {
    binding: Rc<ReactiveBinding>,
    extensions: Extensions,
}

impl HookPipeline {
    pub fn new(extensions: Extensions) -> Self {
        Self {
            binding: Rc::new(ReactiveBinding::default()),
            extensions,
        }
    }

    pub fn binding(&self) -> &Rc<ReactiveBinding> {
        &self.binding
    }

    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn builtin(&self) -> (CompactString, Rc<dyn ComponentHooks>) {
        let binding: Rc<dyn ComponentHooks> = self.binding.clone();
        (ReactiveBinding::NAME.into(), binding)
    }

    /// Every stage in dispatch order.
    pub fn stages(&self) -> Vec<(CompactString, Rc<dyn ComponentHooks>)> {
        let mut stages = vec![self.builtin()];
        stages.extend(self.extensions.component_hooks());
        stages
    }

    fn run(
        phase: HookPhase,
        tag: &str,
        stages: Vec<(CompactString, Rc<dyn ComponentHooks>)>,
        hook: impl Fn(&dyn ComponentHooks) -> Result<(), HookError>,
    ) {
        for (name, stage) in stages {
            if let Err(err) = hook(stage.as_ref()) {
                tracing::error!(
                    extension = %name,
                    phase = %phase,
                    component = tag,
                    %err,
                    "extension hook failed"
                );
            }
        }
    }

    pub fn fetch_component(&self, definition: &ComponentDefinition) {
        Self::run(HookPhase::Fetch, &definition.tag, self.stages(), |stage| {
            stage.on_fetch_component(definition)
        });
    }

    /// Run only the built-in binding stage.
    pub fn init_builtin(&self, ctx: &InitContext<'_>) {
        Self::run(HookPhase::Init, ctx.instance.tag(), vec![self.builtin()], |stage| {
            stage.on_init(ctx)
        });
    }

    /// Run every extension's init hook, skipping the built-in stage.
    pub fn init_extensions(&self, ctx: &InitContext<'_>) {
        Self::run(
            HookPhase::Init,
            ctx.instance.tag(),
            self.extensions.component_hooks(),
            |stage| stage.on_init(ctx),
        );
    }

    pub fn cleanup(&self, ctx: &CleanupContext<'_>) {
        Self::run(HookPhase::Cleanup, ctx.instance.tag(), self.stages(), |stage| {
            stage.on_cleanup(ctx)
        });
    }
}
