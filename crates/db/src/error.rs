//! Error type shared by every document store backend.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by a document store call. Passed through to callers unchanged.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Driver(#[from] mongodb::error::Error),

    #[error("invalid document identifier `{value}`")]
    InvalidId {
        value: String,
        #[source]
        source: bson::oid::Error,
    },

    #[error("validation failed for `{field}`: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("failed to decode document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),

    #[error("store did not report an identifier for inserted document")]
    MissingId,
}

impl StoreError {
    /// Create a validation error for a single field
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create an unsupported-query error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedQuery(message.into())
    }
}

/// Parse a hex object id, keeping the raw input for diagnostics.
pub fn parse_object_id(value: &str) -> StoreResult<bson::oid::ObjectId> {
    bson::oid::ObjectId::parse_str(value).map_err(|source| StoreError::InvalidId {
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_object_id_accepts_hex() {
        let id = bson::oid::ObjectId::new();
        assert_eq!(parse_object_id(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn parse_object_id_rejects_placeholder() {
        let err = parse_object_id("<personId>").unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { ref value, .. } if value == "<personId>"));
        assert!(err.to_string().contains("<personId>"));
    }
}
