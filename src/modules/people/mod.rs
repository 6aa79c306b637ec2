pub mod models;
pub mod repository;

use async_trait::async_trait;
use people_kernel::{InitCtx, Module};

pub use models::{NewPerson, Person, PersonId, PersonSummary};
pub use repository::{PersonKey, PersonRepository, RepoError, RepoResult, COLLECTION};

/// People module: owns the `people` collection's storage requirements
pub struct PeopleModule;

impl PeopleModule {
    pub const fn new() -> Self {
        Self
    }
}

impl Default for PeopleModule {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Module for PeopleModule {
    fn name(&self) -> &'static str {
        "people"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        // Name lookups, deletes by name and the query-chain sort all key on `name`.
        ctx.store.ensure_index(COLLECTION, "name").await?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = %ctx.store.backend(),
            "people module initialized"
        );
        Ok(())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "people module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "people module stopped");
        Ok(())
    }
}

/// Create a new instance of the people module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(PeopleModule::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use people_db::{DocumentStore, MemoryStore};
    use people_kernel::settings::Settings;
    use std::sync::Arc;

    #[tokio::test]
    async fn init_ensures_name_index() {
        let memory = Arc::new(MemoryStore::new());
        let store: Arc<dyn DocumentStore> = memory.clone();
        let settings = Settings::default();
        let ctx = InitCtx {
            settings: &settings,
            store: &store,
        };

        PeopleModule::new().init(&ctx).await.unwrap();
        assert_eq!(memory.indexes(COLLECTION).await, vec!["name".to_string()]);
    }
}
