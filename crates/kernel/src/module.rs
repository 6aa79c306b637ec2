use std::sync::Arc;

use async_trait::async_trait;
use people_db::DocumentStore;

/// Context provided to modules during initialization
pub struct InitCtx<'a> {
    pub settings: &'a crate::settings::Settings,
    /// Process-wide store handle, created once at startup and shut down after
    /// every module has stopped.
    pub store: &'a Arc<dyn DocumentStore>,
}

/// Lifecycle hooks for an application module
#[async_trait]
pub trait Module: Sync + Send {
    /// Unique name for this module
    fn name(&self) -> &'static str;

    /// Prepare storage the module depends on (indexes, collections)
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called after every module has been initialized
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called during shutdown, before the store handle is closed
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
