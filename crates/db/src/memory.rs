//! In-process document store.
//!
//! Collections are vectors in insertion order behind an async-aware
//! `RwLock`. Every write holds the write lock for its whole duration, so
//! find-and-modify calls are atomic with respect to each other.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::filter::{apply_update, matches, project, sort_documents, validate_filter};
use crate::{Backend, DocumentStore, FindOptions};

#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    indexes: HashSet<String>,
}

impl Collection {
    fn position(&self, filter: &Document) -> Option<usize> {
        self.documents.iter().position(|doc| matches(doc, filter))
    }

    fn contains_id(&self, id: &Bson) -> bool {
        self.documents.iter().any(|doc| doc.get("_id") == Some(id))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently held in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, |c| c.documents.len())
    }

    /// Index fields registered through [`DocumentStore::ensure_index`].
    pub async fn indexes(&self, collection: &str) -> Vec<String> {
        let mut fields: Vec<String> = self
            .collections
            .read()
            .await
            .get(collection)
            .map(|c| c.indexes.iter().cloned().collect())
            .unwrap_or_default();
        fields.sort();
        fields
    }
}

fn assign_id(document: &mut Document) -> StoreResult<ObjectId> {
    match document.get("_id") {
        None => {
            let id = ObjectId::new();
            // Keep `_id` as the leading field, as the server does.
            let mut with_id = Document::new();
            with_id.insert("_id", id);
            for (key, value) in std::mem::take(document) {
                with_id.insert(key, value);
            }
            *document = with_id;
            Ok(id)
        }
        Some(Bson::ObjectId(id)) => Ok(*id),
        Some(other) => Err(StoreError::validation(
            "_id",
            format!("expected an ObjectId, got {other}"),
        )),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn backend(&self) -> Backend {
        Backend::Memory
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> StoreResult<ObjectId> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        let id = assign_id(&mut document)?;
        if target.contains_id(&Bson::ObjectId(id)) {
            return Err(StoreError::validation("_id", format!("duplicate key {id}")));
        }
        target.documents.push(document);
        Ok(id)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        let mut collections = self.collections.write().await;
        let target = collections.entry(collection.to_string()).or_default();

        // Stage the whole batch first so a bad document leaves nothing behind.
        let mut staged = Vec::with_capacity(documents.len());
        let mut ids = Vec::with_capacity(documents.len());
        let mut seen = HashSet::new();
        for mut document in documents {
            let id = assign_id(&mut document)?;
            if !seen.insert(id) || target.contains_id(&Bson::ObjectId(id)) {
                return Err(StoreError::validation("_id", format!("duplicate key {id}")));
            }
            ids.push(id);
            staged.push(document);
        }

        target.documents.extend(staged);
        Ok(ids)
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        validate_filter(&filter)?;
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|c| {
                c.documents
                    .iter()
                    .filter(|doc| matches(doc, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        if let Some(sort) = &options.sort {
            sort_documents(&mut found, sort)?;
        }
        // Matches the server: zero means no limit, negative means its absolute value.
        if let Some(limit) = options.limit.filter(|limit| *limit != 0) {
            found.truncate(usize::try_from(limit.unsigned_abs()).unwrap_or(usize::MAX));
        }
        if let Some(projection) = &options.projection {
            found = found
                .into_iter()
                .map(|doc| project(doc, projection))
                .collect::<StoreResult<_>>()?;
        }

        Ok(found)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        validate_filter(&filter)?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.documents.iter().find(|doc| matches(doc, &filter)))
            .cloned())
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        mut replacement: Document,
    ) -> StoreResult<u64> {
        validate_filter(&filter)?;
        if replacement.keys().any(|key| key.starts_with('$')) {
            return Err(StoreError::unsupported(
                "replacement document must not contain update operators",
            ));
        }

        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(index) = target.position(&filter) else {
            return Ok(0);
        };

        let current_id = target.documents[index].get("_id").cloned();
        let replacement_id = replacement.get("_id").cloned();
        match (replacement_id, current_id) {
            (Some(new_id), Some(current)) if new_id != current => {
                return Err(StoreError::validation("_id", "is immutable"));
            }
            (None, Some(current)) => {
                let mut with_id = Document::new();
                with_id.insert("_id", current);
                for (key, value) in replacement {
                    with_id.insert(key, value);
                }
                replacement = with_id;
            }
            _ => {}
        }

        target.documents[index] = replacement;
        Ok(1)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        validate_filter(&filter)?;
        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let Some(index) = target.position(&filter) else {
            return Ok(None);
        };

        // Work on a copy so a rejected operator leaves the stored document intact.
        let mut updated = target.documents[index].clone();
        apply_update(&mut updated, &update)?;
        target.documents[index] = updated.clone();
        Ok(Some(updated))
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        validate_filter(&filter)?;
        let mut collections = self.collections.write().await;
        let removed = collections.get_mut(collection).and_then(|target| {
            target
                .position(&filter)
                .map(|index| target.documents.remove(index))
        });
        Ok(removed)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        validate_filter(&filter)?;
        let mut collections = self.collections.write().await;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let before = target.documents.len();
        target.documents.retain(|doc| !matches(doc, &filter));
        Ok((before - target.documents.len()) as u64)
    }

    async fn ensure_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .indexes
            .insert(field.to_string());
        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        tracing::info!(target: "people-db", backend = %Backend::Memory, "document store closed");
        Ok(())
    }
}
