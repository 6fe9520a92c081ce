//! Administrative flows
//!
//! All flows here are privileged: the runner authorizes `requesterUid`
//! before the handler reads anything. Listing flows return an empty
//! collection when the store fails (logged, not surfaced); status changes
//! propagate failures and are audited.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::warn;

use super::{input_schema, output_schema};
use crate::db::schemas::{
    audit_entry_schema, order_schema, profile_schema, AuditLogEntry, Order, UserProfile,
    UserStatus, ORDER_COLLECTION, USER_COLLECTION,
};
use crate::db::store::DocumentPath;
use crate::db::value::{Document, FieldValue, Fields};
use crate::db::write::Mutation;
use crate::flow::{handler_fn, FlowContext, FlowDefinition, HandlerError};
use crate::schema::{Schema, SchemaError, UnknownFields};

/// Audit action recorded for status changes.
pub const STATUS_UPDATE_ACTION: &str = "user.status.update";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    pub requester_uid: String,
}

fn admin_request_schema(flow: &str) -> Result<Schema, SchemaError> {
    input_schema(
        flow,
        json!({
            "type": "object",
            "required": ["requesterUid"],
            "properties": { "requesterUid": { "type": "string", "minLength": 1 } }
        }),
    )
}

fn list_output_schema(flow: &str, field: &str, item: Value) -> Result<Schema, SchemaError> {
    output_schema(
        flow,
        json!({
            "type": "object",
            "required": [field],
            "properties": { field: { "type": "array", "items": item } }
        }),
        UnknownFields::Strip,
    )
}

/// Decode a document into `T`, skipping it with a warning if malformed.
fn decode<T: serde::de::DeserializeOwned>(doc: &Document, json: Value) -> Option<T> {
    match serde_json::from_value(json) {
        Ok(item) => Some(item),
        Err(e) => {
            warn!(path = %doc.path, error = %e, "Skipping malformed document");
            None
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<UserProfile>,
}

async fn list_users(ctx: FlowContext, _input: AdminRequest) -> Result<UserList, HandlerError> {
    let docs = ctx.services.store.list(USER_COLLECTION).await?;
    let users = docs
        .iter()
        .filter_map(|doc| {
            let mut json = doc.to_json();
            if let Value::Object(map) = &mut json {
                map.entry("uid").or_insert_with(|| Value::String(doc.id().to_string()));
            }
            decode::<UserProfile>(doc, json)
        })
        .collect();
    Ok(UserList { users })
}

pub fn list_all_users() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "list-all-users";
    Ok(FlowDefinition::new(
        NAME,
        admin_request_schema(NAME)?,
        list_output_schema(NAME, "users", profile_schema())?,
        handler_fn(list_users),
    )
    .privileged()
    .return_empty_on_error(json!({ "users": [] })))
}

#[derive(Debug, Serialize)]
pub struct OrderList {
    pub orders: Vec<Order>,
}

async fn list_orders(ctx: FlowContext, _input: AdminRequest) -> Result<OrderList, HandlerError> {
    let docs = ctx.services.store.list(ORDER_COLLECTION).await?;
    let orders = docs
        .iter()
        .filter_map(|doc| decode::<Order>(doc, doc.to_json_with_id()))
        .collect();
    Ok(OrderList { orders })
}

pub fn list_all_orders() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "list-all-orders";
    Ok(FlowDefinition::new(
        NAME,
        admin_request_schema(NAME)?,
        list_output_schema(NAME, "orders", order_schema())?,
        handler_fn(list_orders),
    )
    .privileged()
    .return_empty_on_error(json!({ "orders": [] })))
}

#[derive(Debug, Serialize)]
pub struct AuditLogList {
    pub entries: Vec<AuditLogEntry>,
}

async fn list_audit(ctx: FlowContext, _input: AdminRequest) -> Result<AuditLogList, HandlerError> {
    let entries = ctx.services.audit.entries().await?;
    Ok(AuditLogList { entries })
}

pub fn list_audit_logs() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "list-audit-logs";
    Ok(FlowDefinition::new(
        NAME,
        admin_request_schema(NAME)?,
        list_output_schema(NAME, "entries", audit_entry_schema())?,
        handler_fn(list_audit),
    )
    .privileged()
    .return_empty_on_error(json!({ "entries": [] })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub requester_uid: String,
    pub target_uid: String,
    pub status: UserStatus,
}

#[derive(Debug, Serialize)]
pub struct StatusChanged {
    pub uid: String,
    pub status: UserStatus,
}

async fn change_status(ctx: FlowContext, input: StatusChange) -> Result<StatusChanged, HandlerError> {
    let actor = ctx.caller()?.uid.clone();

    let mut fields = Fields::new();
    fields.insert("status".to_string(), input.status.to_string().into());
    fields.insert("updatedAt".to_string(), FieldValue::ServerTimestamp);

    ctx.services
        .writer
        .write(
            &DocumentPath::new(USER_COLLECTION, &input.target_uid),
            Mutation::Update(fields),
        )
        .await?;

    ctx.services
        .audit
        .record(
            &actor,
            STATUS_UPDATE_ACTION,
            json!({ "targetUid": input.target_uid, "status": input.status }),
        )
        .await;

    Ok(StatusChanged {
        uid: input.target_uid,
        status: input.status,
    })
}

pub fn update_user_status() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "update-user-status";
    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["requesterUid", "targetUid", "status"],
                "properties": {
                    "requesterUid": { "type": "string", "minLength": 1 },
                    "targetUid": { "type": "string", "minLength": 1 },
                    "status": { "enum": ["pending", "active", "suspended"] }
                }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["uid", "status"],
                "properties": {
                    "uid": { "type": "string" },
                    "status": { "enum": ["pending", "active", "suspended"] }
                }
            }),
            UnknownFields::Strip,
        )?,
        handler_fn(change_status),
    )
    .privileged())
}
