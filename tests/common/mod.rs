//! Store wrapper that delegates to [`MemoryStore`] but behaves like the
//! MongoDB driver on empty batches, can be told to fail single inserts and
//! remembers whether it was shut down.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::Document;
use people_db::{Backend, DocumentStore, FindOptions, MemoryStore, StoreError, StoreResult};

#[derive(Default)]
pub struct StrictStore {
    inner: MemoryStore,
    fail_insert_one: bool,
    closed: AtomicBool,
}

impl StrictStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_insert_one() -> Self {
        Self {
            fail_insert_one: true,
            ..Self::default()
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for StrictStore {
    fn backend(&self) -> Backend {
        self.inner.backend()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId> {
        if self.fail_insert_one {
            return Err(StoreError::unsupported("single insert unavailable"));
        }
        self.inner.insert_one(collection, document).await
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        if documents.is_empty() {
            return Err(StoreError::unsupported("no documents provided to insert_many"));
        }
        self.inner.insert_many(collection, documents).await
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        self.inner.find(collection, filter, options).await
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        self.inner.find_one(collection, filter).await
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<u64> {
        self.inner.replace_one(collection, filter, replacement).await
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_one_and_update(collection, filter, update).await
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        self.inner.find_one_and_delete(collection, filter).await
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        self.inner.delete_many(collection, filter).await
    }

    async fn ensure_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        self.inner.ensure_index(collection, field).await
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        self.inner.shutdown().await
    }
}
