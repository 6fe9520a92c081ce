//! Shared test harness: in-memory store, identity directory, mock provider
//! and a recording permission-error observer.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use henhouse::audit::AuditLogger;
use henhouse::auth::{AdminPolicy, AuthorizationGuard, IdentityDirectory};
use henhouse::db::value::fields_from_json;
use henhouse::db::{DocumentPath, FieldValue, MemoryStore, ReliableWriter};
use henhouse::events::{ErrorEvent, ErrorEventChannel, EventName, PermissionError};
use henhouse::flow::{FlowRegistry, FlowRunner, Services};
use henhouse_genai::{GenerativeProvider, MockProvider};
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

pub const ADMIN_UID: &str = "admin-1";
pub const ADMIN_EMAIL: &str = "Ops@Henhouse.example";
pub const FARMER_UID: &str = "farmer-1";
pub const DEALER_UID: &str = "dealer-1";
/// Verified identity that is not on the admin allowlist
pub const NON_ADMIN_UID: &str = "not-admin";

pub struct Harness {
    pub runner: FlowRunner,
    pub store: Arc<MemoryStore>,
    pub events: Arc<ErrorEventChannel>,
    pub provider: Arc<MockProvider>,
    pub writer: ReliableWriter,
}

pub fn harness() -> Harness {
    harness_with(MockProvider::new("mock"), FlowRegistry::standard().unwrap())
}

pub fn harness_with(provider: MockProvider, registry: FlowRegistry) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let events = Arc::new(ErrorEventChannel::new());
    let provider = Arc::new(provider);

    let directory = IdentityDirectory::new();
    directory.insert(ADMIN_UID, ADMIN_EMAIL);
    directory.insert(FARMER_UID, "farmer@example.com");
    directory.insert(DEALER_UID, "dealer@example.com");
    directory.insert(NON_ADMIN_UID, "visitor@example.com");

    let writer = ReliableWriter::new(store.clone(), events.clone());
    let services = Services {
        provider: Some(provider.clone() as Arc<dyn GenerativeProvider>),
        store: store.clone(),
        writer: writer.clone(),
        audit: AuditLogger::new(store.clone()),
    };
    let guard = AuthorizationGuard::new(
        Arc::new(directory),
        AdminPolicy::new(["ops@henhouse.example"]),
    );

    Harness {
        runner: FlowRunner::new(registry, guard, services),
        store,
        events,
        provider,
        writer,
    }
}

/// Record every `permission-error` published on `events`.
pub fn record_permission_errors(events: &ErrorEventChannel) -> Arc<Mutex<Vec<PermissionError>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    events
        .subscribe(EventName::PermissionError, move |event| {
            let ErrorEvent::PermissionError(err) = event;
            sink.lock().push(err.clone());
        })
        .unwrap();
    seen
}

pub fn seed_users(store: &MemoryStore) {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    for (uid, name, role, extra) in [
        (
            ADMIN_UID,
            "Ops",
            "admin",
            json!({}),
        ),
        (
            FARMER_UID,
            "Asha",
            "farmer",
            json!({ "farmerId": "FARM-FARMER", "connectedDealers": [DEALER_UID] }),
        ),
        (
            DEALER_UID,
            "Kumar Feeds",
            "dealer",
            json!({ "dealerCode": "DLR-DEALER", "connectedFarmers": [FARMER_UID] }),
        ),
    ] {
        let mut data = json!({
            "uid": uid,
            "displayName": name,
            "email": format!("{uid}@example.com"),
            "role": role,
            "status": "active",
            "planType": "free"
        });
        if let (Some(target), Some(extra)) = (data.as_object_mut(), extra.as_object()) {
            target.extend(extra.clone());
        }
        let mut fields = fields_from_json(data).unwrap();
        fields.insert("createdAt".into(), FieldValue::Timestamp(created));
        store.seed(&DocumentPath::new("users", uid), fields);
    }
}

pub fn seed_orders(store: &MemoryStore) {
    let created = Utc.with_ymd_and_hms(2024, 4, 12, 6, 0, 0).unwrap();
    for (id, product, quantity) in [("o-1", "Layer mash", 50), ("o-2", "Grower pellets", 20)] {
        let mut fields = fields_from_json(json!({
            "farmerId": FARMER_UID,
            "dealerId": DEALER_UID,
            "productName": product,
            "quantity": quantity,
            "unit": "kg",
            "status": "pending"
        }))
        .unwrap();
        fields.insert("createdAt".into(), FieldValue::Timestamp(created));
        store.seed(&DocumentPath::new("orders", id), fields);
    }
}
