//! Seed data for the in-memory store
//!
//! ```json
//! {
//!   "identities": [{ "uid": "admin-1", "email": "ops@henhouse.example" }],
//!   "collections": {
//!     "users": {
//!       "admin-1": { "displayName": "Ops", "createdAt": { "$timestamp": "2024-05-01T08:00:00Z" } }
//!     }
//!   }
//! }
//! ```
//!
//! An object of the form `{"$timestamp": "<RFC 3339>"}` becomes a native
//! timestamp; everything else is stored as given.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::auth::IdentityDirectory;
use crate::db::memory::MemoryStore;
use crate::db::store::DocumentPath;
use crate::db::value::{FieldValue, Fields};

const TIMESTAMP_KEY: &str = "$timestamp";

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read seed file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse seed data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid seed document {path}: {reason}")]
    InvalidDocument { path: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedIdentity {
    pub uid: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub identities: Vec<SeedIdentity>,
    /// collection -> document id -> fields
    #[serde(default)]
    pub collections: BTreeMap<String, BTreeMap<String, Value>>,
}

impl Seed {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, SeedError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Load identities and documents.
    pub fn apply(&self, store: &MemoryStore, directory: &IdentityDirectory) -> Result<(), SeedError> {
        for identity in &self.identities {
            directory.insert(identity.uid.clone(), identity.email.clone());
        }

        let mut documents = 0;
        for (collection, docs) in &self.collections {
            for (id, data) in docs {
                let path = DocumentPath::new(collection, id);
                let fields = seed_fields(&path, data)?;
                store.seed(&path, fields);
                documents += 1;
            }
        }

        info!(
            identities = self.identities.len(),
            documents, "Seed data loaded"
        );
        Ok(())
    }
}

fn seed_fields(path: &DocumentPath, data: &Value) -> Result<Fields, SeedError> {
    let Value::Object(map) = data else {
        return Err(SeedError::InvalidDocument {
            path: path.to_string(),
            reason: "document data must be an object".to_string(),
        });
    };

    map.iter()
        .map(|(key, value)| seed_value(path, value).map(|v| (key.clone(), v)))
        .collect()
}

fn seed_value(path: &DocumentPath, value: &Value) -> Result<FieldValue, SeedError> {
    match value {
        Value::Object(map) if map.len() == 1 && map.contains_key(TIMESTAMP_KEY) => {
            let raw = map[TIMESTAMP_KEY].as_str().unwrap_or_default();
            let ts = DateTime::parse_from_rfc3339(raw).map_err(|e| SeedError::InvalidDocument {
                path: path.to_string(),
                reason: format!("bad timestamp '{}': {}", raw, e),
            })?;
            Ok(FieldValue::Timestamp(ts.with_timezone(&Utc)))
        }
        Value::Object(map) => Ok(FieldValue::Map(
            map.iter()
                .map(|(k, v)| seed_value(path, v).map(|v| (k.clone(), v)))
                .collect::<Result<Fields, _>>()?,
        )),
        Value::Array(items) => Ok(FieldValue::Array(
            items
                .iter()
                .map(|item| seed_value(path, item))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        other => Ok(FieldValue::from_json(other.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityVerifier;
    use crate::db::store::DocumentStore;
    use chrono::TimeZone;

    const SEED: &str = r#"{
        "identities": [{ "uid": "admin-1", "email": "ops@henhouse.example" }],
        "collections": {
            "users": {
                "admin-1": {
                    "displayName": "Ops",
                    "createdAt": { "$timestamp": "2024-05-01T08:00:00Z" },
                    "history": [{ "at": { "$timestamp": "2024-05-02T08:00:00+05:30" } }]
                }
            }
        }
    }"#;

    #[tokio::test]
    async fn test_apply_seed() {
        let store = MemoryStore::new();
        let directory = IdentityDirectory::new();
        Seed::from_json(SEED).unwrap().apply(&store, &directory).unwrap();

        assert_eq!(
            directory.resolve("admin-1").await.unwrap().verified_email,
            "ops@henhouse.example"
        );

        let doc = store
            .get(&DocumentPath::new("users", "admin-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            doc.get("createdAt"),
            Some(&FieldValue::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap()))
        );
        assert_eq!(doc.to_json()["history"][0]["at"], "2024-05-02T02:30:00.000Z");
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let seed = Seed::from_json(
            r#"{ "collections": { "orders": { "o1": { "createdAt": { "$timestamp": "yesterday" } } } } }"#,
        )
        .unwrap();
        let err = seed
            .apply(&MemoryStore::new(), &IdentityDirectory::new())
            .unwrap_err();
        assert!(matches!(err, SeedError::InvalidDocument { path, .. } if path == "orders/o1"));
    }

    #[test]
    fn test_example_seed_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/seed.example.json");
        let store = MemoryStore::new();
        Seed::load(&path)
            .unwrap()
            .apply(&store, &IdentityDirectory::new())
            .unwrap();
        assert_eq!(store.document_count("users"), 2);
        assert_eq!(store.document_count("orders"), 1);
    }
}
