use thiserror::Error;

use crate::predicate::AttributeExtractionError;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("key not found: {key}")]
    NotFound { key: String },
    #[error("key already exists: {key}")]
    AlreadyExists { key: String },
    #[error("revision mismatch for {key}: expected {expected}, actual {actual}")]
    Conflict {
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error("revision {requested} is too old, oldest available is {oldest}")]
    TooOldRevision { requested: u64, oldest: u64 },
    #[error("invalid resource version: '{0}'")]
    InvalidResourceVersion(String),
    #[error("invalid continue token: '{0}'")]
    InvalidContinue(String),
    #[error("object stored at {key} is not a JSON object")]
    InvalidObject { key: String },
    #[error("invalid storage options: {0}")]
    InvalidOptions(String),
    #[error("attribute extraction: {0}")]
    Attribute(#[from] AttributeExtractionError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
