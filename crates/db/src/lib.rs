//! Document store client factory.
//!
//! Exposes the [`DocumentStore`] data-access trait together with a MongoDB
//! backend and an in-process backend used for tests and offline runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::Document;
use serde::Deserialize;

pub mod error;
pub mod filter;
pub mod memory;
pub mod mongo;

pub use error::{parse_object_id, StoreError, StoreResult};
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Cursor shaping for [`DocumentStore::find`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Field to direction (`1` ascending, `-1` descending), applied in order.
    pub sort: Option<Document>,
    pub limit: Option<i64>,
    /// Either all-inclusion or all-exclusion; `_id` is kept unless excluded.
    pub projection: Option<Document>,
}

impl FindOptions {
    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }
}

/// Async data access over named collections of BSON documents.
///
/// Filters are top-level field equalities; a scalar compared against an array
/// field matches when the array contains it. Updates accept `$set` and `$push`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend label used in logs
    fn backend(&self) -> Backend;

    /// Round-trip to the store to confirm it is reachable
    async fn ping(&self) -> StoreResult<()>;

    /// Insert one document, assigning `_id` when absent
    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId>;

    /// Insert a batch in order; ids are returned in input order
    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>>;

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>>;

    /// First match in natural order
    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>>;

    /// Replace the first match wholesale; returns the matched count
    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<u64>;

    /// Atomically update the first match and return its post-update state
    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>>;

    /// Atomically remove the first match and return it
    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>>;

    /// Remove every match; returns the deleted count
    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64>;

    /// Create an ascending single-field index if it does not exist yet
    async fn ensure_index(&self, collection: &str, field: &str) -> StoreResult<()>;

    /// Release connections; the handle must not be used afterwards
    async fn shutdown(&self) -> StoreResult<()>;
}

/// Which [`DocumentStore`] implementation to connect.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Mongodb,
    Memory,
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mongodb => f.write_str("mongodb"),
            Self::Memory => f.write_str("memory"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub backend: Backend,
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    /// Used when the URI does not name a database.
    #[serde(default = "DatabaseSettings::default_name")]
    pub name: String,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_name() -> String {
        "test".to_string()
    }

    fn default_app_name() -> String {
        "people".to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        5000
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: Backend::default(),
            uri: Self::default_uri(),
            name: Self::default_name(),
            app_name: Self::default_app_name(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
        }
    }
}

/// Open the configured backend and confirm it answers a ping.
pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Arc<dyn DocumentStore>> {
    let store: Arc<dyn DocumentStore> = match settings.backend {
        Backend::Mongodb => Arc::new(MongoStore::connect(settings).await?),
        Backend::Memory => Arc::new(MemoryStore::new()),
    };

    store.ping().await?;
    tracing::info!(target: "people-db", backend = %store.backend(), "document store ready");

    Ok(store)
}
