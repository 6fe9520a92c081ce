//! User onboarding
//!
//! Creates the profile document for a newly registered farmer or dealer.
//! The role-specific id is derived from the uid, so it needs no lookup to
//! stay unique.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{input_schema, output_schema};
use crate::db::schemas::{derive_role_id, profile_schema, UserProfile, UserRole, USER_COLLECTION};
use crate::db::store::{DocumentPath, StoreError};
use crate::db::value::{FieldValue, Fields};
use crate::db::write::Mutation;
use crate::flow::{handler_fn, FlowContext, FlowDefinition, HandlerError};
use crate::schema::{SchemaError, UnknownFields};

const NAME: &str = "onboard-user";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub uid: String,
    pub display_name: String,
    pub email: String,
    pub role: UserRole,
    pub mobile: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Onboarded {
    pub profile: UserProfile,
}

fn profile_fields(registration: Registration) -> Fields {
    let mut fields = Fields::new();
    let role_id = derive_role_id(registration.role, &registration.uid);

    match registration.role {
        UserRole::Farmer => {
            fields.insert("role".into(), "farmer".into());
            if let Some(id) = role_id {
                fields.insert("farmerId".into(), id.into());
            }
            fields.insert("connectedDealers".into(), FieldValue::Array(Vec::new()));
        }
        UserRole::Dealer => {
            fields.insert("role".into(), "dealer".into());
            if let Some(code) = role_id {
                fields.insert("dealerCode".into(), code.into());
            }
            fields.insert("connectedFarmers".into(), FieldValue::Array(Vec::new()));
        }
        UserRole::Admin => {
            fields.insert("role".into(), "admin".into());
        }
    }

    fields.insert("uid".into(), registration.uid.into());
    fields.insert("displayName".into(), registration.display_name.into());
    fields.insert("email".into(), registration.email.into());
    fields.insert("status".into(), "pending".into());
    fields.insert("planType".into(), "free".into());

    for (key, value) in [
        ("mobile", registration.mobile),
        ("state", registration.state),
        ("district", registration.district),
        ("postalCode", registration.postal_code),
    ] {
        if let Some(value) = value {
            fields.insert(key.into(), value.into());
        }
    }

    fields.insert("createdAt".into(), FieldValue::ServerTimestamp);
    fields.insert("updatedAt".into(), FieldValue::ServerTimestamp);
    fields
}

async fn onboard(ctx: FlowContext, input: Registration) -> Result<Onboarded, HandlerError> {
    let path = DocumentPath::new(USER_COLLECTION, &input.uid);

    ctx.services
        .writer
        .write(&path, Mutation::Create(profile_fields(input)))
        .await?;

    // Read back for the store-resolved timestamps.
    let doc = ctx
        .services
        .store
        .get(&path)
        .await?
        .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

    let profile = serde_json::from_value(doc.to_json())
        .map_err(|e| HandlerError::Store(StoreError::InvalidData(format!("{}: {}", path, e))))?;
    Ok(Onboarded { profile })
}

pub fn onboard_user() -> Result<FlowDefinition, SchemaError> {
    let optional_text = json!({ "type": "string", "minLength": 1 });

    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["uid", "displayName", "email", "role"],
                "properties": {
                    "uid": { "type": "string", "minLength": 1 },
                    "displayName": { "type": "string", "minLength": 1 },
                    "email": { "type": "string", "pattern": "^[^@\\s]+@[^@\\s]+$" },
                    "role": { "enum": ["farmer", "dealer"] },
                    "mobile": optional_text,
                    "state": optional_text,
                    "district": optional_text,
                    "postalCode": optional_text
                }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["profile"],
                "properties": { "profile": profile_schema() }
            }),
            UnknownFields::Strip,
        )?,
        handler_fn(onboard),
    ))
}
