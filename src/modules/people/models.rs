use bson::oid::ObjectId;
use people_db::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier of a person document.
pub type PersonId = ObjectId;

/// Persisted person document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// Assigned by the store on insert, never changed afterwards
    #[serde(rename = "_id")]
    pub id: PersonId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl Person {
    pub fn validate(&self) -> StoreResult<()> {
        validate_name(&self.name)
    }

    /// Whether this document carries exactly the fields of `input`.
    pub fn matches(&self, input: &NewPerson) -> bool {
        self.name == input.name
            && self.age == input.age
            && self.favorite_foods == input.favorite_foods
    }
}

/// Insert payload: a person before the store has assigned an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i32>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

impl NewPerson {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            age: None,
            favorite_foods: Vec::new(),
        }
    }

    pub fn with_age(mut self, age: i32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        validate_name(&self.name)
    }

    /// Attach the identifier the store assigned on insert.
    pub fn into_person(self, id: PersonId) -> Person {
        Person {
            id,
            name: self.name,
            age: self.age,
            favorite_foods: self.favorite_foods,
        }
    }
}

/// Projection returned by query chaining: the document without `age`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonSummary {
    #[serde(rename = "_id")]
    pub id: PersonId,
    pub name: String,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
}

fn validate_name(name: &str) -> StoreResult<()> {
    if name.trim().is_empty() {
        return Err(StoreError::validation("name", "is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, Bson};

    #[test]
    fn new_person_serializes_with_camel_case_and_skips_missing_age() {
        let person = NewPerson::new("John Doe").with_foods(["Pizza", "Burger"]);
        let document = bson::to_document(&person).unwrap();
        assert_eq!(
            document,
            doc! { "name": "John Doe", "favoriteFoods": ["Pizza", "Burger"] }
        );
    }

    #[test]
    fn person_decodes_without_optional_fields() {
        let id = ObjectId::new();
        let person: Person = bson::from_document(doc! { "_id": id, "name": "Mary" }).unwrap();
        assert_eq!(person.id, id);
        assert_eq!(person.age, None);
        assert!(person.favorite_foods.is_empty());
    }

    #[test]
    fn person_document_keeps_id_field_name() {
        let person = NewPerson::new("Alice").with_age(25).into_person(ObjectId::new());
        let document = bson::to_document(&person).unwrap();
        assert!(matches!(document.get("_id"), Some(Bson::ObjectId(id)) if *id == person.id));
        assert_eq!(document.get_i32("age").unwrap(), 25);
    }

    #[test]
    fn blank_name_fails_validation() {
        let err = NewPerson::new("   ").validate().unwrap_err();
        assert!(matches!(err, StoreError::Validation { field: "name", .. }));
        assert!(NewPerson::new("Bob").validate().is_ok());
    }

    #[test]
    fn summary_decodes_projected_document() {
        let id = ObjectId::new();
        let summary: PersonSummary = bson::from_document(
            doc! { "_id": id, "name": "Bob", "favoriteFoods": ["Burritos"] },
        )
        .unwrap();
        assert_eq!(summary.name, "Bob");
        assert_eq!(summary.favorite_foods, vec!["Burritos".to_string()]);
    }
}
