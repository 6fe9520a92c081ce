//! Identity verification
//!
//! A caller-supplied uid is not trusted until a verifier resolves it to an
//! [`Identity`] carrying the verified email.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// A resolved, verified identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub verified_email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Identity not found: {uid}")]
pub struct IdentityNotFound {
    pub uid: String,
}

/// Resolves claimed uids to verified identities.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn resolve(&self, uid: &str) -> Result<Identity, IdentityNotFound>;
}

/// In-memory uid -> verified email directory.
#[derive(Default)]
pub struct IdentityDirectory {
    entries: DashMap<String, String>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uid: impl Into<String>, verified_email: impl Into<String>) {
        self.entries.insert(uid.into(), verified_email.into());
    }

    pub fn remove(&self, uid: &str) -> bool {
        self.entries.remove(uid).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for IdentityDirectory {
    async fn resolve(&self, uid: &str) -> Result<Identity, IdentityNotFound> {
        self.entries
            .get(uid)
            .map(|email| Identity {
                uid: uid.to_string(),
                verified_email: email.value().clone(),
            })
            .ok_or_else(|| IdentityNotFound {
                uid: uid.to_string(),
            })
    }
}
