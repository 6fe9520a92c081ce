//! User profile document
//!
//! Stored in `users/{uid}`. Farmers and dealers carry a role-specific id
//! derived from their uid, plus the set of counterparts they are connected to.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Collection name for user profiles
pub const USER_COLLECTION: &str = "users";

/// Number of uid characters used in role-specific ids.
const ROLE_ID_PREFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Farmer,
    Dealer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Pending,
    Active,
    Suspended,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserStatus::Pending => "pending",
            UserStatus::Active => "active",
            UserStatus::Suspended => "suspended",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    #[default]
    Free,
    Premium,
}

/// User profile as returned to callers. Timestamps are ISO-8601 strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub plan_type: PlanType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,

    /// Farmers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub farmer_id: Option<String>,
    /// Farmers only: uids of connected dealers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_dealers: Option<Vec<String>>,
    /// Dealers only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dealer_code: Option<String>,
    /// Dealers only: uids of connected farmers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_farmers: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Derive the role-specific identifier for a user.
///
/// Farmers get `FARM-XXXXXX`, dealers `DLR-XXXXXX`, where `XXXXXX` is the
/// upper-cased uid prefix. Admins have none. Distinct uids with distinct
/// prefixes always yield distinct ids.
pub fn derive_role_id(role: UserRole, uid: &str) -> Option<String> {
    let prefix: String = uid
        .chars()
        .take(ROLE_ID_PREFIX_LEN)
        .collect::<String>()
        .to_uppercase();

    match role {
        UserRole::Farmer => Some(format!("FARM-{}", prefix)),
        UserRole::Dealer => Some(format!("DLR-{}", prefix)),
        UserRole::Admin => None,
    }
}

/// JSON schema for a [`UserProfile`] leaving a flow.
pub fn profile_schema() -> Value {
    let optional_string = json!({ "type": "string" });
    let timestamp = json!({ "type": "string", "format": "date-time" });
    let uid_list = json!({ "type": "array", "items": { "type": "string" } });

    json!({
        "type": "object",
        "required": ["uid", "displayName", "email", "role", "status", "planType"],
        "properties": {
            "uid": { "type": "string", "minLength": 1 },
            "displayName": { "type": "string" },
            "email": { "type": "string" },
            "role": { "enum": ["farmer", "dealer", "admin"] },
            "status": { "enum": ["pending", "active", "suspended"] },
            "planType": { "enum": ["free", "premium"] },
            "mobile": optional_string,
            "state": optional_string,
            "district": optional_string,
            "postalCode": optional_string,
            "farmerId": optional_string,
            "connectedDealers": uid_list,
            "dealerCode": optional_string,
            "connectedFarmers": uid_list,
            "createdAt": timestamp,
            "updatedAt": timestamp
        }
    })
}
