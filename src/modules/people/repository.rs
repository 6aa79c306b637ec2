//! Typed CRUD and query operations over the `people` collection.
//!
//! Writes validate before reaching the store and reads decode strictly.
//! Single-document lookups report absence as `None`; mutations that need a
//! target report it as [`RepoError::NotFound`], never as a store error.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use bson::{doc, Document};
use people_db::{parse_object_id, DocumentStore, FindOptions, StoreError};
use thiserror::Error;

use super::models::{NewPerson, Person, PersonId, PersonSummary};

/// Collection name for person documents.
pub const COLLECTION: &str = "people";

/// At most this many documents come back from [`PersonRepository::query_chain`].
pub const QUERY_CHAIN_LIMIT: i64 = 2;

pub type RepoResult<T> = Result<T, RepoError>;

/// What a not-found outcome was looking for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonKey {
    Id(PersonId),
    Name(String),
}

impl Display for PersonKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "id {id}"),
            Self::Name(name) => write!(f, "name `{name}`"),
        }
    }
}

/// Outcome of a failed repository call.
#[derive(Error, Debug)]
pub enum RepoError {
    /// The request was well formed but nothing matched.
    #[error("person not found by {0}")]
    NotFound(PersonKey),

    /// The store rejected or could not serve the call.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<bson::ser::Error> for RepoError {
    fn from(value: bson::ser::Error) -> Self {
        Self::Store(StoreError::Encode(value))
    }
}

impl From<bson::de::Error> for RepoError {
    fn from(value: bson::de::Error) -> Self {
        Self::Store(StoreError::Decode(value))
    }
}

/// Repository over an explicitly passed store handle. Cloning shares the handle.
#[derive(Clone)]
pub struct PersonRepository {
    store: Arc<dyn DocumentStore>,
}

impl PersonRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Insert one person and return it with its assigned id.
    pub async fn insert_one(&self, person: NewPerson) -> RepoResult<Person> {
        person.validate()?;
        let document = bson::to_document(&person)?;

        let id = self.store.insert_one(COLLECTION, document).await?;
        tracing::debug!(collection = COLLECTION, %id, "person inserted");

        Ok(person.into_person(id))
    }

    /// Insert a batch in one store call. Every input is validated first, so
    /// one invalid person rejects the whole batch before anything is written.
    pub async fn insert_many(&self, people: Vec<NewPerson>) -> RepoResult<Vec<Person>> {
        // The MongoDB driver rejects an empty batch.
        if people.is_empty() {
            return Ok(Vec::new());
        }

        let mut documents = Vec::with_capacity(people.len());
        for person in &people {
            person.validate()?;
            documents.push(bson::to_document(person)?);
        }

        let ids = self.store.insert_many(COLLECTION, documents).await?;
        tracing::debug!(collection = COLLECTION, count = ids.len(), "people inserted");

        Ok(people
            .into_iter()
            .zip(ids)
            .map(|(person, id)| person.into_person(id))
            .collect())
    }

    /// Every person whose name is exactly `name`, in natural order.
    pub async fn find_by_name(&self, name: &str) -> RepoResult<Vec<Person>> {
        let documents = self
            .store
            .find(COLLECTION, doc! { "name": name }, FindOptions::default())
            .await?;
        tracing::debug!(
            collection = COLLECTION,
            person_name = name,
            count = documents.len(),
            "find by name"
        );

        decode_all(documents)
    }

    /// First person, in natural order, whose favorite foods include `food`.
    pub async fn find_one_by_favorite_food(&self, food: &str) -> RepoResult<Option<Person>> {
        let found = self
            .store
            .find_one(COLLECTION, doc! { "favoriteFoods": food })
            .await?;
        tracing::debug!(
            collection = COLLECTION,
            food,
            found = found.is_some(),
            "find one by food"
        );

        found.map(decode).transpose()
    }

    /// Look a person up by the hex form of its id.
    ///
    /// # Errors
    /// - `RepoError::Store(StoreError::InvalidId)` when `id` is not a valid id.
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Person>> {
        let id = parse_object_id(id)?;
        let found = self.store.find_one(COLLECTION, doc! { "_id": id }).await?;
        tracing::debug!(collection = COLLECTION, %id, found = found.is_some(), "find by id");

        found.map(decode).transpose()
    }

    /// Load, append `food`, and save the whole document back.
    ///
    /// This is a read-modify-write round trip, not an atomic update: a
    /// concurrent writer between the load and the save is overwritten.
    pub async fn append_favorite_food_and_save(&self, id: &str, food: &str) -> RepoResult<Person> {
        let id = parse_object_id(id)?;
        let mut person = match self.store.find_one(COLLECTION, doc! { "_id": id }).await? {
            Some(document) => decode(document)?,
            None => return Err(RepoError::NotFound(PersonKey::Id(id))),
        };

        person.favorite_foods.push(food.to_string());
        person.validate()?;

        let matched = self
            .store
            .replace_one(COLLECTION, doc! { "_id": id }, bson::to_document(&person)?)
            .await?;
        if matched == 0 {
            // Removed between load and save.
            return Err(RepoError::NotFound(PersonKey::Id(id)));
        }

        tracing::debug!(
            collection = COLLECTION,
            %id,
            food,
            foods = person.favorite_foods.len(),
            "favorite food appended"
        );
        Ok(person)
    }

    /// Atomically set the age of the first person named `name` and return the
    /// post-update document.
    pub async fn update_age_by_name(&self, name: &str, age: i32) -> RepoResult<Person> {
        let updated = self
            .store
            .find_one_and_update(
                COLLECTION,
                doc! { "name": name },
                doc! { "$set": { "age": age } },
            )
            .await?;

        match updated {
            Some(document) => {
                tracing::debug!(collection = COLLECTION, person_name = name, age, "age updated");
                decode(document)
            }
            None => Err(RepoError::NotFound(PersonKey::Name(name.to_string()))),
        }
    }

    /// Delete one person by id and return the removed document.
    pub async fn delete_by_id(&self, id: &str) -> RepoResult<Person> {
        let id = parse_object_id(id)?;
        let removed = self
            .store
            .find_one_and_delete(COLLECTION, doc! { "_id": id })
            .await?;

        match removed {
            Some(document) => {
                tracing::debug!(collection = COLLECTION, %id, "person deleted");
                decode(document)
            }
            None => Err(RepoError::NotFound(PersonKey::Id(id))),
        }
    }

    /// Delete every person named `name`; returns how many were removed.
    pub async fn delete_many_by_name(&self, name: &str) -> RepoResult<u64> {
        let deleted = self
            .store
            .delete_many(COLLECTION, doc! { "name": name })
            .await?;
        tracing::debug!(collection = COLLECTION, person_name = name, deleted, "people deleted");

        Ok(deleted)
    }

    /// People who like `food`, sorted by name, at most two, without `age`.
    pub async fn query_chain(&self, food: &str) -> RepoResult<Vec<PersonSummary>> {
        let options = FindOptions::default()
            .sort(doc! { "name": 1 })
            .limit(QUERY_CHAIN_LIMIT)
            .projection(doc! { "age": 0 });

        let documents = self
            .store
            .find(COLLECTION, doc! { "favoriteFoods": food }, options)
            .await?;
        tracing::debug!(collection = COLLECTION, food, count = documents.len(), "query chain");

        documents
            .into_iter()
            .map(|document| bson::from_document(document).map_err(RepoError::from))
            .collect()
    }
}

fn decode(document: Document) -> RepoResult<Person> {
    let person: Person = bson::from_document(document)?;
    person.validate()?;
    Ok(person)
}

fn decode_all(documents: Vec<Document>) -> RepoResult<Vec<Person>> {
    documents.into_iter().map(decode).collect()
}
