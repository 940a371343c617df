//! The built-in reactive binding stage.

use easel_croquis::{bind_placeholders, mark_placeholders};

use crate::definition::ComponentDefinition;
use crate::error::HookError;
use crate::hooks::{CleanupContext, ComponentHooks, InitContext};

/// Marks placeholders when a definition is fetched, binds them when an
/// instance connects and releases them when it disconnects.
///
/// The subscriptions live on the instance, so dropping an instance without
/// disconnecting it releases them too.
#[derive(Debug, Default)]
pub struct ReactiveBinding;

impl ReactiveBinding {
    pub const NAME: &'static str = "reactive-binding";
}

impl ComponentHooks for ReactiveBinding {
    fn on_fetch_component(&self, definition: &ComponentDefinition) -> Result<(), HookError> {
        let marked = mark_placeholders(&definition.template);
        tracing::debug!(component = %definition.tag, marked, "placeholders marked");
        Ok(())
    }

    fn on_init(&self, ctx: &InitContext<'_>) -> Result<(), HookError> {
        let instance = ctx.instance;
        let bindings = instance.with_rx(|rx| bind_placeholders(instance.tree(), rx));
        // Replacing a set releases the previous one
        instance.set_bindings(bindings);
        Ok(())
    }

    fn on_cleanup(&self, ctx: &CleanupContext<'_>) -> Result<(), HookError> {
        ctx.instance.release_bindings();
        Ok(())
    }
}
