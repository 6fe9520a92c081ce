//! Flow definitions and handlers
//!
//! A flow is a named unit of work with an input schema, an output schema
//! and a handler. Definitions are built once at startup and shared
//! read-only by every invocation.

use async_trait::async_trait;
use henhouse_genai::{GenerationError, GenerativeProvider};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::audit::AuditLogger;
use crate::auth::Identity;
use crate::db::store::DocumentStore;
use crate::db::write::ReliableWriter;
use crate::flow::error::HandlerError;
use crate::schema::Schema;

/// Input field carrying the caller's uid on privileged flows.
pub const REQUESTER_FIELD: &str = "requesterUid";

/// Whether a flow requires an authorized caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Open,
    /// The uid in [`REQUESTER_FIELD`] must pass the admin policy
    Admin,
}

/// What the runner does when the handler fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HandlerErrorPolicy {
    /// Return the failure to the caller
    #[default]
    Propagate,
    /// Log the failure and return the flow's empty output
    ReturnEmpty,
}

impl fmt::Display for HandlerErrorPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerErrorPolicy::Propagate => f.write_str("propagate"),
            HandlerErrorPolicy::ReturnEmpty => f.write_str("returnEmpty"),
        }
    }
}

/// Collaborators available to handlers.
#[derive(Clone)]
pub struct Services {
    pub provider: Option<Arc<dyn GenerativeProvider>>,
    pub store: Arc<dyn DocumentStore>,
    pub writer: ReliableWriter,
    pub audit: AuditLogger,
}

impl Services {
    /// The configured generative provider.
    pub fn provider(&self) -> Result<&Arc<dyn GenerativeProvider>, HandlerError> {
        self.provider.as_ref().ok_or_else(|| {
            HandlerError::Generation(GenerationError::Unavailable(
                "no generative provider configured".to_string(),
            ))
        })
    }
}

/// Per-invocation context handed to a handler.
#[derive(Clone)]
pub struct FlowContext {
    pub services: Services,
    /// Set for privileged flows once the caller is authorized
    pub identity: Option<Identity>,
}

impl FlowContext {
    /// The authorized caller, for handlers of privileged flows.
    pub fn caller(&self) -> Result<&Identity, HandlerError> {
        self.identity
            .as_ref()
            .ok_or_else(|| HandlerError::Contract("no authorized caller".to_string()))
    }
}

/// Executes a flow on validated input.
#[async_trait]
pub trait FlowHandler: Send + Sync {
    async fn handle(&self, ctx: FlowContext, input: Value) -> Result<Value, HandlerError>;
}

/// Handler built from an async function over typed input and output.
pub struct FnHandler<I, O, F> {
    f: F,
    _marker: PhantomData<fn(I) -> O>,
}

/// Wrap `f` as a [`FlowHandler`].
///
/// The validated input is deserialized into `I` and the result serialized
/// back to JSON for output validation.
pub fn handler_fn<I, O, F, Fut>(f: F) -> FnHandler<I, O, F>
where
    F: Fn(FlowContext, I) -> Fut,
    Fut: Future<Output = Result<O, HandlerError>>,
{
    FnHandler {
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<I, O, F, Fut> FlowHandler for FnHandler<I, O, F>
where
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
    F: Fn(FlowContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, HandlerError>> + Send + 'static,
{
    async fn handle(&self, ctx: FlowContext, input: Value) -> Result<Value, HandlerError> {
        let input: I =
            serde_json::from_value(input).map_err(|e| HandlerError::Contract(e.to_string()))?;
        let output = (self.f)(ctx, input).await?;
        serde_json::to_value(output).map_err(|e| HandlerError::Contract(e.to_string()))
    }
}

/// A registered flow.
pub struct FlowDefinition {
    name: String,
    input: Schema,
    output: Schema,
    privilege: Privilege,
    on_handler_error: HandlerErrorPolicy,
    empty_output: Option<Value>,
    handler: Arc<dyn FlowHandler>,
}

impl fmt::Debug for FlowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlowDefinition")
            .field("name", &self.name)
            .field("privilege", &self.privilege)
            .field("on_handler_error", &self.on_handler_error)
            .finish()
    }
}

impl FlowDefinition {
    /// An open flow that propagates handler failures.
    pub fn new(
        name: impl Into<String>,
        input: Schema,
        output: Schema,
        handler: impl FlowHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            input,
            output,
            privilege: Privilege::Open,
            on_handler_error: HandlerErrorPolicy::Propagate,
            empty_output: None,
            handler: Arc::new(handler),
        }
    }

    /// Require an authorized caller.
    pub fn privileged(mut self) -> Self {
        self.privilege = Privilege::Admin;
        self
    }

    /// The value returned under [`HandlerErrorPolicy::ReturnEmpty`].
    pub fn with_empty_output(mut self, empty: Value) -> Self {
        self.empty_output = Some(empty);
        self
    }

    /// Swallow handler failures, returning `empty` instead.
    pub fn return_empty_on_error(self, empty: Value) -> Self {
        self.with_empty_output(empty)
            .with_policy(HandlerErrorPolicy::ReturnEmpty)
    }

    pub fn with_policy(mut self, policy: HandlerErrorPolicy) -> Self {
        self.on_handler_error = policy;
        self
    }

    pub(crate) fn set_policy(&mut self, policy: HandlerErrorPolicy) {
        self.on_handler_error = policy;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_schema(&self) -> &Schema {
        &self.input
    }

    pub fn output_schema(&self) -> &Schema {
        &self.output
    }

    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    pub fn is_privileged(&self) -> bool {
        self.privilege == Privilege::Admin
    }

    pub fn on_handler_error(&self) -> HandlerErrorPolicy {
        self.on_handler_error
    }

    pub fn empty_output(&self) -> Option<&Value> {
        self.empty_output.as_ref()
    }

    pub(crate) fn handler(&self) -> &Arc<dyn FlowHandler> {
        &self.handler
    }
}
