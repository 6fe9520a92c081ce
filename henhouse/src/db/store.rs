//! Document store capability
//!
//! Single-document, collection-addressed CRUD. Implementations must only
//! return from a mutation once it has been applied (or has failed).

use async_trait::async_trait;
use std::fmt;

use crate::db::value::{Document, Fields};

/// Address of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    pub collection: String,
    pub id: String,
}

impl DocumentPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// How `set` treats fields already on the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SetMode {
    /// Replace the whole document
    #[default]
    Replace,
    /// Overwrite only the given fields
    Merge,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Invalid document data: {0}")]
    InvalidData(String),

    #[error("Store error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document.
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError>;

    /// Read every document in a collection, ordered by id.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Create a document; fails if it already exists.
    async fn create(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError>;

    /// Write a document whether or not it exists.
    async fn set(&self, path: &DocumentPath, fields: Fields, mode: SetMode) -> Result<(), StoreError>;

    /// Overwrite fields of an existing document; fails if it is missing.
    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting a missing document succeeds.
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;

    /// Create a document with a store-generated id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentPath, StoreError>;
}
