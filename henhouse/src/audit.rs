//! Audit trail for administrative actions.
//!
//! Entries are appended to `auditLogs`. Recording never fails the action
//! being recorded: a failed append is logged and dropped.

use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use crate::db::schemas::{AuditLogEntry, AUDIT_LOG_COLLECTION};
use crate::db::store::{DocumentPath, DocumentStore, StoreError};
use crate::db::value::{FieldValue, Fields};

/// Appends and reads audit entries.
#[derive(Clone)]
pub struct AuditLogger {
    store: Arc<dyn DocumentStore>,
}

impl AuditLogger {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Append an entry. Returns its path, or `None` if the append failed.
    pub async fn record(&self, actor: &str, action: &str, detail: Value) -> Option<DocumentPath> {
        let mut fields = Fields::new();
        fields.insert("actor".to_string(), actor.into());
        fields.insert("action".to_string(), action.into());
        fields.insert("detail".to_string(), FieldValue::from_json(detail));
        fields.insert("timestamp".to_string(), FieldValue::ServerTimestamp);

        match self.store.add(AUDIT_LOG_COLLECTION, fields).await {
            Ok(path) => {
                info!(%actor, %action, entry = %path.id, "Audit entry recorded");
                Some(path)
            }
            Err(e) => {
                warn!(%actor, %action, error = %e, "Failed to record audit entry");
                None
            }
        }
    }

    /// All entries, newest first. Malformed entries are skipped.
    pub async fn entries(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        let mut entries: Vec<AuditLogEntry> = self
            .store
            .list(AUDIT_LOG_COLLECTION)
            .await?
            .iter()
            .filter_map(|doc| match serde_json::from_value(doc.to_json_with_id()) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(path = %doc.path, error = %e, "Skipping malformed audit entry");
                    None
                }
            })
            .collect();

        // Fixed-width ISO-8601 sorts chronologically as text.
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
