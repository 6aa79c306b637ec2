//! Query evaluation for the in-memory backend.
//!
//! Mirrors the subset of MongoDB semantics the repository relies on:
//! top-level equality with array containment, multi-key sort, inclusion or
//! exclusion projection, and `$set` / `$push` updates.

use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::error::{StoreError, StoreResult};

const ID_FIELD: &str = "_id";

/// Reject operator keys the evaluator does not understand.
pub fn validate_filter(filter: &Document) -> StoreResult<()> {
    for (key, value) in filter {
        if key.starts_with('$') {
            return Err(StoreError::unsupported(format!(
                "filter operator `{key}` is not supported"
            )));
        }
        if let Bson::Document(inner) = value {
            if let Some(op) = inner.keys().find(|k| k.starts_with('$')) {
                return Err(StoreError::unsupported(format!(
                    "filter operator `{op}` on `{key}` is not supported"
                )));
            }
        }
    }
    Ok(())
}

/// Whether `document` satisfies every equality in `filter`.
pub fn matches(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(key, expected)| match document.get(key) {
        Some(Bson::Array(items)) if !matches!(expected, Bson::Array(_)) => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(actual) => values_equal(actual, expected),
        None => matches!(expected, Bson::Null),
    })
}

fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

/// Total order over the value kinds the store keeps. Missing sorts first.
pub fn compare_values(left: Option<&Bson>, right: Option<&Bson>) -> Ordering {
    let (left, right) = match (left, right) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(l), Some(r)) => (l, r),
    };

    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l.partial_cmp(&r).unwrap_or(Ordering::Equal);
    }

    match (left, right) {
        (Bson::String(l), Bson::String(r)) => l.cmp(r),
        (Bson::ObjectId(l), Bson::ObjectId(r)) => l.bytes().cmp(&r.bytes()),
        (Bson::Boolean(l), Bson::Boolean(r)) => l.cmp(r),
        (Bson::DateTime(l), Bson::DateTime(r)) => l.cmp(r),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) => 7,
        _ => 8,
    }
}

/// Stable sort by each `field: direction` pair in order.
pub fn sort_documents(documents: &mut [Document], sort: &Document) -> StoreResult<()> {
    let mut keys = Vec::with_capacity(sort.len());
    for (field, direction) in sort {
        let descending = match as_number(direction) {
            Some(d) if d == 1.0 => false,
            Some(d) if d == -1.0 => true,
            _ => {
                return Err(StoreError::unsupported(format!(
                    "sort direction for `{field}` must be 1 or -1"
                )))
            }
        };
        keys.push((field.as_str(), descending));
    }

    documents.sort_by(|a, b| {
        keys.iter()
            .map(|(field, descending)| {
                let ord = compare_values(a.get(*field), b.get(*field));
                if *descending {
                    ord.reverse()
                } else {
                    ord
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });

    Ok(())
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(v) => *v,
        other => as_number(other).is_some_and(|n| n != 0.0),
    }
}

/// Apply an inclusion (`field: 1`) or exclusion (`field: 0`) projection.
pub fn project(document: Document, projection: &Document) -> StoreResult<Document> {
    let include_id = projection.get(ID_FIELD).map_or(true, is_truthy);
    let mut inclusion = None;
    for (field, flag) in projection.iter().filter(|(field, _)| *field != ID_FIELD) {
        let included = is_truthy(flag);
        match inclusion {
            None => inclusion = Some(included),
            Some(mode) if mode != included => {
                return Err(StoreError::unsupported(format!(
                    "projection mixes inclusion and exclusion at `{field}`"
                )))
            }
            Some(_) => {}
        }
    }

    let projected = match inclusion {
        Some(true) => document
            .into_iter()
            .filter(|(field, _)| {
                (field == ID_FIELD && include_id) || projection.contains_key(field.as_str())
            })
            .collect(),
        _ => document
            .into_iter()
            .filter(|(field, _)| {
                if field == ID_FIELD {
                    include_id
                } else {
                    !projection.contains_key(field.as_str())
                }
            })
            .collect(),
    };

    Ok(projected)
}

/// Apply `$set` / `$push` operators in place.
pub fn apply_update(document: &mut Document, update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::unsupported("update document is empty"));
    }

    for (operator, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::unsupported(format!(
                "operator `{operator}` expects a document"
            )));
        };

        for (field, value) in fields {
            if field == ID_FIELD {
                return Err(StoreError::validation("_id", "is immutable"));
            }
            match operator.as_str() {
                "$set" => {
                    document.insert(field.clone(), value.clone());
                }
                "$push" => match document.get_mut(field) {
                    Some(Bson::Array(items)) => items.push(value.clone()),
                    Some(_) => {
                        return Err(StoreError::validation(
                            "$push",
                            format!("field `{field}` is not an array"),
                        ))
                    }
                    None => {
                        document.insert(field.clone(), Bson::Array(vec![value.clone()]));
                    }
                },
                other => {
                    return Err(StoreError::unsupported(format!(
                        "update operator `{other}` is not supported"
                    )))
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn scalar_filter_matches_array_membership() {
        let person = doc! { "name": "Alice", "favoriteFoods": ["Sushi", "Pasta"] };
        assert!(matches(&person, &doc! { "favoriteFoods": "Sushi" }));
        assert!(!matches(&person, &doc! { "favoriteFoods": "Tacos" }));
        assert!(matches(
            &person,
            &doc! { "favoriteFoods": ["Sushi", "Pasta"] }
        ));
    }

    #[test]
    fn numeric_equality_crosses_integer_widths() {
        let person = doc! { "age": 20_i32 };
        assert!(matches(&person, &doc! { "age": 20_i64 }));
        assert!(matches(&person, &doc! { "age": 20.0 }));
    }

    #[test]
    fn missing_field_only_matches_null() {
        let person = doc! { "name": "Bob" };
        assert!(matches(&person, &doc! { "age": Bson::Null }));
        assert!(!matches(&person, &doc! { "age": 35 }));
    }

    #[test]
    fn operator_filters_are_rejected() {
        assert!(validate_filter(&doc! { "$or": [] }).is_err());
        assert!(validate_filter(&doc! { "age": { "$gt": 3 } }).is_err());
        assert!(validate_filter(&doc! { "name": "Mary" }).is_ok());
    }

    #[test]
    fn sort_orders_by_name_then_age_descending() {
        let mut people = vec![
            doc! { "name": "Charlie", "age": 40 },
            doc! { "name": "Alice", "age": 25 },
            doc! { "name": "Alice", "age": 31 },
        ];
        sort_documents(&mut people, &doc! { "name": 1, "age": -1 }).unwrap();
        let ages: Vec<i32> = people.iter().map(|p| p.get_i32("age").unwrap()).collect();
        assert_eq!(ages, vec![31, 25, 40]);
    }

    #[test]
    fn sort_rejects_unknown_direction() {
        let mut people = vec![doc! { "name": "A" }];
        assert!(sort_documents(&mut people, &doc! { "name": "asc" }).is_err());
    }

    #[test]
    fn exclusion_projection_drops_field_and_keeps_id() {
        let id = bson::oid::ObjectId::new();
        let person = doc! { "_id": id, "name": "Alice", "age": 25 };
        let projected = project(person, &doc! { "age": 0 }).unwrap();
        assert_eq!(projected, doc! { "_id": id, "name": "Alice" });
    }

    #[test]
    fn inclusion_projection_keeps_only_listed_fields() {
        let person = doc! { "_id": 1, "name": "Alice", "age": 25 };
        let projected = project(person, &doc! { "name": 1, "_id": 0 }).unwrap();
        assert_eq!(projected, doc! { "name": "Alice" });
    }

    #[test]
    fn mixed_projection_is_rejected() {
        let person = doc! { "name": "Alice", "age": 25 };
        assert!(project(person, &doc! { "name": 1, "age": 0 }).is_err());
    }

    #[test]
    fn set_and_push_update_fields() {
        let mut person = doc! { "name": "Alice", "favoriteFoods": ["Sushi"] };
        apply_update(
            &mut person,
            &doc! { "$set": { "age": 20 }, "$push": { "favoriteFoods": "Ramen" } },
        )
        .unwrap();
        assert_eq!(person.get_i32("age").unwrap(), 20);
        assert_eq!(
            person.get_array("favoriteFoods").unwrap(),
            &vec![Bson::from("Sushi"), Bson::from("Ramen")]
        );
    }

    #[test]
    fn update_without_operator_is_rejected() {
        let mut person = doc! { "name": "Alice" };
        let err = apply_update(&mut person, &doc! { "age": 20 }).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedQuery(_)));
    }
}
