//! In-memory document store
//!
//! Backs tests and the CLI. Supports failure injection per operation and
//! counts reads so callers can assert that nothing was touched.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::db::store::{DocumentPath, DocumentStore, SetMode, StoreError};
use crate::db::value::{resolve_fields, Document, Fields};

/// Store operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Get,
    List,
    Create,
    Set,
    Update,
    Delete,
    Add,
}

/// Concurrent in-memory store. Collections keep documents ordered by id.
#[derive(Default)]
pub struct MemoryStore {
    collections: DashMap<String, BTreeMap<String, Fields>>,
    failures: DashMap<StoreOp, StoreError>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing counters and failures.
    pub fn seed(&self, path: &DocumentPath, fields: Fields) {
        self.collections
            .entry(path.collection.clone())
            .or_default()
            .insert(path.id.clone(), fields);
    }

    /// Make every future `op` fail with `error` until cleared.
    pub fn fail_on(&self, op: StoreOp, error: StoreError) {
        self.failures.insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    /// Number of get/list calls served (including failed ones).
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of mutation calls attempted (including failed ones).
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        match op {
            StoreOp::Get | StoreOp::List => self.reads.fetch_add(1, Ordering::SeqCst),
            _ => self.writes.fetch_add(1, Ordering::SeqCst),
        };

        match self.failures.get(&op) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn stamp(mut fields: Fields) -> Fields {
        resolve_fields(&mut fields, Utc::now());
        fields
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Document>, StoreError> {
        self.check(StoreOp::Get)?;
        Ok(self
            .collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id).cloned())
            .map(|fields| Document {
                path: path.clone(),
                fields,
            }))
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.check(StoreOp::List)?;
        Ok(self
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        path: DocumentPath::new(collection, id.clone()),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        self.check(StoreOp::Create)?;
        let mut docs = self.collections.entry(path.collection.clone()).or_default();
        if docs.contains_key(&path.id) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        docs.insert(path.id.clone(), Self::stamp(fields));
        debug!(path = %path, "Created document");
        Ok(())
    }

    async fn set(&self, path: &DocumentPath, fields: Fields, mode: SetMode) -> Result<(), StoreError> {
        self.check(StoreOp::Set)?;
        let fields = Self::stamp(fields);
        let mut docs = self.collections.entry(path.collection.clone()).or_default();
        debug!(path = %path, ?mode, "Set document");

        if mode == SetMode::Merge {
            if let Some(existing) = docs.get_mut(&path.id) {
                existing.extend(fields);
                return Ok(());
            }
        }
        docs.insert(path.id.clone(), fields);
        Ok(())
    }

    async fn update(&self, path: &DocumentPath, fields: Fields) -> Result<(), StoreError> {
        self.check(StoreOp::Update)?;
        let mut docs = self
            .collections
            .get_mut(&path.collection)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        let existing = docs
            .get_mut(&path.id)
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        existing.extend(Self::stamp(fields));
        debug!(path = %path, "Updated document");
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.check(StoreOp::Delete)?;
        if let Some(mut docs) = self.collections.get_mut(&path.collection) {
            docs.remove(&path.id);
        }
        debug!(path = %path, "Deleted document");
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<DocumentPath, StoreError> {
        self.check(StoreOp::Add)?;
        let path = DocumentPath::new(collection, uuid::Uuid::new_v4().simple().to_string());
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(path.id.clone(), Self::stamp(fields));
        debug!(path = %path, "Added document");
        Ok(path)
    }
}
