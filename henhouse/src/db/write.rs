//! Write reliability wrapper
//!
//! Every mutation that a flow performs goes through [`ReliableWriter`]:
//!
//! 1. The store mutation is awaited; success is reported only after the
//!    store confirms it.
//! 2. On failure a [`PermissionError`] describing the attempted request is
//!    published on the [`ErrorEventChannel`], then the original store error
//!    is returned to the caller. Both happen for every failure.
//!
//! One document, one attempt: no retries, no batching.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

use crate::db::store::{DocumentPath, DocumentStore, SetMode, StoreError};
use crate::db::value::{fields_to_json, Fields};
use crate::events::{ErrorEvent, ErrorEventChannel, PermissionError, RuleOperation, SecurityRuleContext};

/// Kinds of mutation the wrapper performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOperation {
    Create,
    Set,
    Update,
    Delete,
}

impl WriteOperation {
    /// The operation reported in a security-rule context.
    pub fn rule_operation(self) -> RuleOperation {
        match self {
            WriteOperation::Create => RuleOperation::Create,
            WriteOperation::Set | WriteOperation::Update => RuleOperation::Update,
            WriteOperation::Delete => RuleOperation::Delete,
        }
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WriteOperation::Create => "create",
            WriteOperation::Set => "set",
            WriteOperation::Update => "update",
            WriteOperation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A single-document mutation and its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(Fields),
    Set(Fields, SetMode),
    Update(Fields),
    Delete,
}

impl Mutation {
    pub fn operation(&self) -> WriteOperation {
        match self {
            Mutation::Create(_) => WriteOperation::Create,
            Mutation::Set(..) => WriteOperation::Set,
            Mutation::Update(_) => WriteOperation::Update,
            Mutation::Delete => WriteOperation::Delete,
        }
    }

    fn payload(&self) -> Option<Value> {
        match self {
            Mutation::Create(fields) | Mutation::Set(fields, _) | Mutation::Update(fields) => {
                Some(Value::Object(fields_to_json(fields)))
            }
            Mutation::Delete => None,
        }
    }
}

/// Awaits store mutations and publishes their failures.
#[derive(Clone)]
pub struct ReliableWriter {
    store: Arc<dyn DocumentStore>,
    events: Arc<ErrorEventChannel>,
}

impl ReliableWriter {
    pub fn new(store: Arc<dyn DocumentStore>, events: Arc<ErrorEventChannel>) -> Self {
        Self { store, events }
    }

    /// Apply `mutation` to the document at `path`.
    ///
    /// Returns only after the store has confirmed or rejected the write.
    pub async fn write(&self, path: &DocumentPath, mutation: Mutation) -> Result<(), StoreError> {
        let operation = mutation.operation();
        let payload = mutation.payload();

        let result = match mutation {
            Mutation::Create(fields) => self.store.create(path, fields).await,
            Mutation::Set(fields, mode) => self.store.set(path, fields, mode).await,
            Mutation::Update(fields) => self.store.update(path, fields).await,
            Mutation::Delete => self.store.delete(path).await,
        };

        match result {
            Ok(()) => {
                debug!(path = %path, %operation, "Write confirmed");
                Ok(())
            }
            Err(err) => {
                self.publish(path.to_string(), operation.rule_operation(), payload, &err);
                Err(err)
            }
        }
    }

    fn publish(
        &self,
        resource_path: String,
        operation: RuleOperation,
        request_payload: Option<Value>,
        cause: &StoreError,
    ) {
        error!(path = %resource_path, %operation, error = %cause, "Write failed");

        let permission_error = PermissionError::new(SecurityRuleContext {
            resource_path,
            operation,
            request_payload,
        });
        self.events.emit(ErrorEvent::PermissionError(permission_error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::{MemoryStore, StoreOp};
    use crate::db::value::fields_from_json;
    use crate::events::EventName;
    use parking_lot::Mutex;
    use serde_json::json;

    fn setup() -> (Arc<MemoryStore>, Arc<ErrorEventChannel>, ReliableWriter) {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(ErrorEventChannel::new());
        let writer = ReliableWriter::new(store.clone(), events.clone());
        (store, events, writer)
    }

    fn capture(events: &ErrorEventChannel) -> Arc<Mutex<Vec<PermissionError>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        events
            .subscribe(EventName::PermissionError, move |event| {
                let ErrorEvent::PermissionError(error) = event;
                sink.lock().push(error.clone());
            })
            .unwrap();
        seen
    }

    #[tokio::test]
    async fn test_success_emits_nothing() {
        let (store, events, writer) = setup();
        let seen = capture(&events);
        let path = DocumentPath::new("users", "u1");

        writer
            .write(&path, Mutation::Create(fields_from_json(json!({ "role": "farmer" })).unwrap()))
            .await
            .unwrap();

        assert!(seen.lock().is_empty());
        assert_eq!(store.document_count("users"), 1);
    }

    #[tokio::test]
    async fn test_failure_published_and_returned() {
        let (store, events, writer) = setup();
        let seen = capture(&events);
        let path = DocumentPath::new("users", "u1");
        store.seed(&path, Fields::new());
        store.fail_on(StoreOp::Update, StoreError::ConnectionLost("reset".into()));

        let result = writer
            .write(&path, Mutation::Update(fields_from_json(json!({ "status": "active" })).unwrap()))
            .await;

        assert_eq!(result, Err(StoreError::ConnectionLost("reset".into())));
        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path(), "users/u1");
        assert_eq!(seen[0].operation(), RuleOperation::Update);
        assert_eq!(
            seen[0].context.request_payload,
            Some(json!({ "status": "active" }))
        );
    }

    #[tokio::test]
    async fn test_delete_failure_has_no_payload() {
        let (store, events, writer) = setup();
        let seen = capture(&events);
        store.fail_on(StoreOp::Delete, StoreError::PermissionDenied("orders/o1".into()));

        let result = writer.write(&DocumentPath::new("orders", "o1"), Mutation::Delete).await;

        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
        let seen = seen.lock();
        assert_eq!(seen[0].operation(), RuleOperation::Delete);
        assert!(seen[0].context.request_payload.is_none());
    }

    #[tokio::test]
    async fn test_failure_without_subscribers_still_returned() {
        let (store, _events, writer) = setup();
        store.fail_on(StoreOp::Create, StoreError::Internal("disk full".into()));

        let result = writer
            .write(&DocumentPath::new("users", "u2"), Mutation::Create(Fields::new()))
            .await;
        assert_eq!(result, Err(StoreError::Internal("disk full".into())));
    }

    #[test]
    fn test_operation_mapping() {
        assert_eq!(WriteOperation::Create.rule_operation(), RuleOperation::Create);
        assert_eq!(WriteOperation::Set.rule_operation(), RuleOperation::Update);
        assert_eq!(WriteOperation::Update.rule_operation(), RuleOperation::Update);
        assert_eq!(WriteOperation::Delete.rule_operation(), RuleOperation::Delete);
    }
}
