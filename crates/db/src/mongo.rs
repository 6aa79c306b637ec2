//! MongoDB backend over the official driver.

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection, Database, IndexModel};

use crate::error::{StoreError, StoreResult};
use crate::{Backend, DatabaseSettings, DocumentStore, FindOptions};

/// MongoDB client bound to one database. The driver pools connections.
pub struct MongoStore {
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Build a client from the connection string. The driver connects lazily;
    /// [`crate::connect`] follows up with a ping.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let mut options = ClientOptions::parse(settings.uri.as_str()).await?;
        options.app_name = Some(settings.app_name.clone());
        options.connect_timeout = Some(settings.connect_timeout());
        options.server_selection_timeout = Some(settings.connect_timeout());

        let client = Client::with_options(options)?;
        let database = client
            .default_database()
            .unwrap_or_else(|| client.database(&settings.name));

        tracing::info!(
            target: "people-db",
            backend = %Backend::Mongodb,
            database = database.name(),
            "document store client created"
        );

        Ok(Self { client, database })
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.database.collection(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn backend(&self) -> Backend {
        Backend::Mongodb
    }

    async fn ping(&self) -> StoreResult<()> {
        self.database.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    async fn insert_one(&self, collection: &str, document: Document) -> StoreResult<ObjectId> {
        let result = self.collection(collection).insert_one(document).await?;
        result.inserted_id.as_object_id().ok_or(StoreError::MissingId)
    }

    async fn insert_many(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> StoreResult<Vec<ObjectId>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let count = documents.len();
        let result = self.collection(collection).insert_many(documents).await?;

        (0..count)
            .map(|index| {
                result
                    .inserted_ids
                    .get(&index)
                    .and_then(|id| id.as_object_id())
                    .ok_or(StoreError::MissingId)
            })
            .collect()
    }

    async fn find(
        &self,
        collection: &str,
        filter: Document,
        options: FindOptions,
    ) -> StoreResult<Vec<Document>> {
        let mut driver_options = mongodb::options::FindOptions::default();
        driver_options.sort = options.sort;
        driver_options.limit = options.limit;
        driver_options.projection = options.projection;

        let cursor = self
            .collection(collection)
            .find(filter)
            .with_options(driver_options)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_one(&self, collection: &str, filter: Document) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one(filter).await?)
    }

    async fn replace_one(
        &self,
        collection: &str,
        filter: Document,
        replacement: Document,
    ) -> StoreResult<u64> {
        let result = self
            .collection(collection)
            .replace_one(filter, replacement)
            .await?;
        Ok(result.matched_count)
    }

    async fn find_one_and_update(
        &self,
        collection: &str,
        filter: Document,
        update: Document,
    ) -> StoreResult<Option<Document>> {
        let mut options = FindOneAndUpdateOptions::default();
        options.return_document = Some(ReturnDocument::After);

        Ok(self
            .collection(collection)
            .find_one_and_update(filter, update)
            .with_options(options)
            .await?)
    }

    async fn find_one_and_delete(
        &self,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Option<Document>> {
        Ok(self.collection(collection).find_one_and_delete(filter).await?)
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let result = self.collection(collection).delete_many(filter).await?;
        Ok(result.deleted_count)
    }

    async fn ensure_index(&self, collection: &str, field: &str) -> StoreResult<()> {
        let mut keys = Document::new();
        keys.insert(field, 1);
        let index = IndexModel::builder().keys(keys).build();
        self.collection(collection).create_index(index).await?;
        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;
        tracing::info!(target: "people-db", backend = %Backend::Mongodb, "document store closed");
        Ok(())
    }
}
