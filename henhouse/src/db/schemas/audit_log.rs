//! Audit log entry document
//!
//! Append-only record of administrative actions, stored in `auditLogs`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Collection name for audit entries
pub const AUDIT_LOG_COLLECTION: &str = "auditLogs";

/// Audit entry as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    /// ISO-8601
    pub timestamp: String,
    /// uid of the acting user
    pub actor: String,
    /// Dotted action name, e.g. `user.status.update`
    pub action: String,
    #[serde(default)]
    pub detail: Value,
}

pub fn audit_entry_schema() -> Value {
    json!({
        "type": "object",
        "required": ["id", "timestamp", "actor", "action"],
        "properties": {
            "id": { "type": "string" },
            "timestamp": { "type": "string", "format": "date-time" },
            "actor": { "type": "string" },
            "action": { "type": "string" },
            "detail": {}
        }
    })
}
