//! Error event channel
//!
//! An explicitly constructed publish/subscribe bus for failures that
//! detached observers (UI error banners, diagnostics) need to see without
//! being wired into the call site that failed.
//!
//! Dispatch is synchronous: `emit` invokes every listener currently
//! registered for the event name, in registration order, before returning.
//! Events emitted with no listeners are dropped, never buffered.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Default cap on registered listeners across all event names.
pub const DEFAULT_MAX_SUBSCRIBERS: usize = 1024;

/// Operation named in a security-rule context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleOperation {
    Get,
    List,
    Create,
    Update,
    Delete,
}

impl fmt::Display for RuleOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleOperation::Get => "get",
            RuleOperation::List => "list",
            RuleOperation::Create => "create",
            RuleOperation::Update => "update",
            RuleOperation::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// The request a failed mutation attempted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityRuleContext {
    pub resource_path: String,
    pub operation: RuleOperation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_payload: Option<Value>,
}

/// A denied or failed mutation, as published to observers.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct PermissionError {
    pub context: SecurityRuleContext,
    pub message: String,
}

impl PermissionError {
    /// Wrap a context, deriving the human-readable message from it.
    pub fn new(context: SecurityRuleContext) -> Self {
        let rendered = serde_json::to_string_pretty(&context)
            .unwrap_or_else(|_| format!("{} {}", context.operation, context.resource_path));
        let message = format!(
            "Missing or insufficient permissions: the following request was denied by security rules:\n{}",
            rendered
        );
        Self { context, message }
    }

    pub fn path(&self) -> &str {
        &self.context.resource_path
    }

    pub fn operation(&self) -> RuleOperation {
        self.context.operation
    }
}

/// Names of events carried by the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    PermissionError,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::PermissionError => "permission-error",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event and its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorEvent {
    PermissionError(PermissionError),
}

impl ErrorEvent {
    pub fn name(&self) -> EventName {
        match self {
            ErrorEvent::PermissionError(_) => EventName::PermissionError,
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Subscriber limit of {max} reached")]
    SubscriberLimit { max: usize },
}

type Listener = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;

struct Subscriber {
    handle: SubscriptionHandle,
    event: EventName,
    listener: Listener,
}

/// Process-scoped error event bus.
///
/// Share it by `Arc` with every component that emits or observes.
pub struct ErrorEventChannel {
    subscribers: RwLock<Vec<Subscriber>>,
    next_handle: AtomicU64,
    max_subscribers: usize,
}

impl ErrorEventChannel {
    pub fn new() -> Self {
        Self::with_max_subscribers(DEFAULT_MAX_SUBSCRIBERS)
    }

    pub fn with_max_subscribers(max_subscribers: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_handle: AtomicU64::new(1),
            max_subscribers,
        }
    }

    pub fn max_subscribers(&self) -> usize {
        self.max_subscribers
    }

    /// Register a listener for one event name.
    pub fn subscribe<F>(&self, event: EventName, listener: F) -> Result<SubscriptionHandle, ChannelError>
    where
        F: Fn(&ErrorEvent) + Send + Sync + 'static,
    {
        let mut subscribers = self.subscribers.write();
        if subscribers.len() >= self.max_subscribers {
            warn!(event = %event, max = self.max_subscribers, "Rejected subscriber: limit reached");
            return Err(ChannelError::SubscriberLimit {
                max: self.max_subscribers,
            });
        }

        let handle = SubscriptionHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        subscribers.push(Subscriber {
            handle,
            event,
            listener: Arc::new(listener),
        });
        debug!(event = %event, handle = handle.0, "Subscribed");
        Ok(handle)
    }

    /// Remove a listener. Returns false if the handle was not registered.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.handle != handle);
        before != subscribers.len()
    }

    /// Deliver `event` to every current listener for its name.
    ///
    /// A listener removed by an earlier listener during the same emit is
    /// not called. Listeners added during an emit see the next one.
    /// Returns the number of listeners invoked.
    pub fn emit(&self, event: ErrorEvent) -> usize {
        let name = event.name();

        // Snapshot so listeners may subscribe/unsubscribe without deadlocking.
        let listeners: Vec<(SubscriptionHandle, Listener)> = self
            .subscribers
            .read()
            .iter()
            .filter(|s| s.event == name)
            .map(|s| (s.handle, Arc::clone(&s.listener)))
            .collect();

        if listeners.is_empty() {
            debug!(event = %name, "Dropped event with no subscribers");
            return 0;
        }

        let mut invoked = 0;
        for (handle, listener) in &listeners {
            if !self.is_registered(*handle) {
                continue;
            }
            listener(&event);
            invoked += 1;
        }
        invoked
    }

    fn is_registered(&self, handle: SubscriptionHandle) -> bool {
        self.subscribers.read().iter().any(|s| s.handle == handle)
    }

    pub fn subscriber_count(&self, event: EventName) -> usize {
        self.subscribers
            .read()
            .iter()
            .filter(|s| s.event == event)
            .count()
    }
}

impl Default for ErrorEventChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;

    fn permission_event(path: &str) -> ErrorEvent {
        ErrorEvent::PermissionError(PermissionError::new(SecurityRuleContext {
            resource_path: path.to_string(),
            operation: RuleOperation::Update,
            request_payload: Some(json!({ "status": "active" })),
        }))
    }

    #[test]
    fn test_emit_in_registration_order() {
        let channel = ErrorEventChannel::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let seen = Arc::clone(&seen);
            channel
                .subscribe(EventName::PermissionError, move |_| seen.lock().push(id))
                .unwrap();
        }

        assert_eq!(channel.emit(permission_event("users/a")), 3);
        assert_eq!(*seen.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn test_no_subscribers_drops_event() {
        let channel = ErrorEventChannel::new();
        assert_eq!(channel.emit(permission_event("users/a")), 0);

        // A late subscriber does not see earlier events.
        let seen = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&seen);
        channel
            .subscribe(EventName::PermissionError, move |_| *counter.lock() += 1)
            .unwrap();
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn test_unsubscribe() {
        let channel = ErrorEventChannel::new();
        let hits = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&hits);
        let handle = channel
            .subscribe(EventName::PermissionError, move |_| *counter.lock() += 1)
            .unwrap();

        channel.emit(permission_event("users/a"));
        assert!(channel.unsubscribe(handle));
        assert!(!channel.unsubscribe(handle));
        channel.emit(permission_event("users/b"));

        assert_eq!(*hits.lock(), 1);
        assert_eq!(channel.subscriber_count(EventName::PermissionError), 0);
    }

    #[test]
    fn test_subscriber_limit() {
        let channel = ErrorEventChannel::with_max_subscribers(2);
        channel.subscribe(EventName::PermissionError, |_| {}).unwrap();
        channel.subscribe(EventName::PermissionError, |_| {}).unwrap();

        let result = channel.subscribe(EventName::PermissionError, |_| {});
        assert!(matches!(result, Err(ChannelError::SubscriberLimit { max: 2 })));
    }

    #[test]
    fn test_listener_can_unsubscribe_itself() {
        let channel = Arc::new(ErrorEventChannel::new());
        let slot: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));

        let inner_channel = Arc::clone(&channel);
        let inner_slot = Arc::clone(&slot);
        let handle = channel
            .subscribe(EventName::PermissionError, move |_| {
                if let Some(handle) = *inner_slot.lock() {
                    inner_channel.unsubscribe(handle);
                }
            })
            .unwrap();
        *slot.lock() = Some(handle);

        assert_eq!(channel.emit(permission_event("users/a")), 1);
        assert_eq!(channel.emit(permission_event("users/a")), 0);
    }

    #[test]
    fn test_listener_removed_mid_emit_is_skipped() {
        let channel = Arc::new(ErrorEventChannel::new());
        let second: Arc<Mutex<Option<SubscriptionHandle>>> = Arc::new(Mutex::new(None));
        let hits = Arc::new(Mutex::new(Vec::new()));

        let inner_channel = Arc::clone(&channel);
        let inner_second = Arc::clone(&second);
        let first_hits = Arc::clone(&hits);
        channel
            .subscribe(EventName::PermissionError, move |_| {
                first_hits.lock().push("first");
                if let Some(handle) = inner_second.lock().take() {
                    inner_channel.unsubscribe(handle);
                }
            })
            .unwrap();

        let second_hits = Arc::clone(&hits);
        let handle = channel
            .subscribe(EventName::PermissionError, move |_| second_hits.lock().push("second"))
            .unwrap();
        *second.lock() = Some(handle);

        assert_eq!(channel.emit(permission_event("users/a")), 1);
        assert_eq!(*hits.lock(), vec!["first"]);
        assert_eq!(channel.subscriber_count(EventName::PermissionError), 1);
    }

    #[test]
    fn test_permission_error_message() {
        let ErrorEvent::PermissionError(error) = permission_event("users/u1");
        assert!(error.message.starts_with("Missing or insufficient permissions"));
        assert!(error.message.contains("\"resourcePath\": \"users/u1\""));
        assert!(error.message.contains("\"operation\": \"update\""));
        assert_eq!(error.operation(), RuleOperation::Update);
    }
}
