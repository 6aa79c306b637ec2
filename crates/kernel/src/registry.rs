use anyhow::Context;
use std::future::Future;
use std::sync::Arc;

use crate::module::{InitCtx, Module};

/// Module registry driving init, start and stop across registered modules
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module; registration order is startup order
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse registration order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules in reverse order", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Initialize and start every module, run `work`, then stop the modules
    /// and close the store.
    ///
    /// Stop and close run even when startup or `work` fails. The first error
    /// in that order is the one returned.
    pub async fn run<T, F, Fut>(&self, ctx: &InitCtx<'_>, work: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let outcome = match self.init_and_start(ctx).await {
            Ok(()) => work().await,
            Err(err) => {
                tracing::error!(error = %err, "module startup failed; shutting down");
                Err(err)
            }
        };

        let stopped = self.stop_modules().await;
        let closed = ctx
            .store
            .shutdown()
            .await
            .with_context(|| "failed to close the document store");

        let value = outcome?;
        stopped?;
        closed?;
        Ok(value)
    }

    async fn init_and_start(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.init_modules(ctx).await?;
        self.start_modules(ctx).await
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
