//! Flow runner
//!
//! Drives one invocation through
//! `Received -> InputValidated -> [Authorized] -> Executed -> OutputValidated -> Returned`.
//! Any step can fail; the handler never runs on invalid input or for an
//! unauthorized caller, and no output leaves the runner without passing the
//! flow's output schema.
//!
//! Invocations share nothing but the services they are handed, so any
//! number may run concurrently on one runner.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::auth::{AuthorizationGuard, Identity};
use crate::flow::definition::{FlowContext, FlowDefinition, HandlerErrorPolicy, Services, REQUESTER_FIELD};
use crate::flow::error::{FlowError, HandlerError};
use crate::flow::registry::FlowRegistry;
use crate::schema::{FieldIssue, ValidationError};

pub struct FlowRunner {
    registry: Arc<FlowRegistry>,
    guard: AuthorizationGuard,
    services: Services,
}

impl FlowRunner {
    pub fn new(registry: FlowRegistry, guard: AuthorizationGuard, services: Services) -> Self {
        Self {
            registry: Arc::new(registry),
            guard,
            services,
        }
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Run the flow called `name` on `input`.
    pub async fn run(&self, name: &str, input: Value) -> Result<Value, FlowError> {
        let flow = self
            .registry
            .get(name)
            .ok_or_else(|| FlowError::UnknownFlow(name.to_string()))?;

        debug!(flow = %name, "Flow received");

        let input = flow.input_schema().validate(input).map_err(|e| {
            debug!(flow = %name, error = %e, "Input rejected");
            FlowError::InvalidInput(e)
        })?;
        debug!(flow = %name, "Input validated");

        let identity = if flow.is_privileged() {
            Some(self.authorize(flow, &input).await?)
        } else {
            None
        };

        let ctx = FlowContext {
            services: self.services.clone(),
            identity,
        };

        let output = match flow.handler().handle(ctx, input).await {
            Ok(output) => output,
            Err(err) => return self.handler_failed(flow, err),
        };
        debug!(flow = %name, "Handler executed");

        let output = flow.output_schema().validate(output).map_err(|e| {
            error!(flow = %name, error = %e, "Handler produced output violating its schema");
            FlowError::InvalidOutput {
                flow: name.to_string(),
                source: e,
            }
        })?;

        info!(flow = %name, "Flow completed");
        Ok(output)
    }

    async fn authorize(&self, flow: &FlowDefinition, input: &Value) -> Result<Identity, FlowError> {
        let requester = input
            .get(REQUESTER_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                FlowError::InvalidInput(ValidationError {
                    schema: flow.input_schema().name().to_string(),
                    issues: vec![FieldIssue {
                        path: REQUESTER_FIELD.to_string(),
                        message: "privileged flows require a requester uid".to_string(),
                    }],
                })
            })?;

        let identity = self.guard.authorize(requester).await?;
        debug!(flow = %flow.name(), uid = %identity.uid, "Caller authorized");
        Ok(identity)
    }

    fn handler_failed(&self, flow: &FlowDefinition, err: HandlerError) -> Result<Value, FlowError> {
        match (flow.on_handler_error(), flow.empty_output()) {
            (HandlerErrorPolicy::ReturnEmpty, Some(empty)) => {
                warn!(
                    flow = %flow.name(),
                    error = %err,
                    "Handler failed, returning empty result"
                );
                Ok(empty.clone())
            }
            _ => {
                warn!(flow = %flow.name(), error = %err, "Handler failed");
                Err(FlowError::Handler {
                    flow: flow.name().to_string(),
                    source: err,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditLogger;
    use crate::auth::{AdminPolicy, IdentityDirectory};
    use crate::db::memory::MemoryStore;
    use crate::db::write::ReliableWriter;
    use crate::events::ErrorEventChannel;
    use crate::flow::definition::handler_fn;
    use crate::schema::{Schema, UnknownFields};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn services() -> Services {
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(ErrorEventChannel::new());
        Services {
            provider: None,
            store: store.clone(),
            writer: ReliableWriter::new(store.clone(), events),
            audit: AuditLogger::new(store),
        }
    }

    fn guard() -> AuthorizationGuard {
        let directory = IdentityDirectory::new();
        directory.insert("admin-1", "ops@henhouse.example");
        AuthorizationGuard::new(Arc::new(directory), AdminPolicy::new(["ops@henhouse.example"]))
    }

    fn greeting_flow(ran: Arc<AtomicBool>) -> FlowDefinition {
        let input = Schema::new(
            "greet.input",
            json!({
                "type": "object",
                "required": ["name"],
                "properties": { "name": { "type": "string", "minLength": 1 } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();
        let output = Schema::new(
            "greet.output",
            json!({
                "type": "object",
                "required": ["greeting"],
                "properties": { "greeting": { "type": "string" } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();

        FlowDefinition::new(
            "greet",
            input,
            output,
            handler_fn(move |_ctx: FlowContext, input: Value| {
                let ran = ran.clone();
                async move {
                    ran.store(true, Ordering::SeqCst);
                    let name = input["name"].as_str().unwrap_or_default().to_string();
                    Ok::<_, HandlerError>(json!({ "greeting": format!("Hello, {name}") }))
                }
            }),
        )
    }

    fn runner_with(flow: FlowDefinition) -> FlowRunner {
        let mut registry = FlowRegistry::new();
        registry.register(flow).unwrap();
        FlowRunner::new(registry, guard(), services())
    }

    #[tokio::test]
    async fn test_run_open_flow() {
        let runner = runner_with(greeting_flow(Arc::new(AtomicBool::new(false))));
        let output = runner.run("greet", json!({ "name": "Asha" })).await.unwrap();
        assert_eq!(output, json!({ "greeting": "Hello, Asha" }));
    }

    #[tokio::test]
    async fn test_invalid_input_skips_handler() {
        let ran = Arc::new(AtomicBool::new(false));
        let runner = runner_with(greeting_flow(ran.clone()));

        let err = runner.run("greet", json!({ "name": "" })).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidInput(_)));
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_unknown_flow() {
        let runner = runner_with(greeting_flow(Arc::new(AtomicBool::new(false))));
        let err = runner.run("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownFlow(name) if name == "nope"));
    }

    #[tokio::test]
    async fn test_privileged_denied_before_handler() {
        let ran = Arc::new(AtomicBool::new(false));
        let input = Schema::new(
            "secret.input",
            json!({
                "type": "object",
                "required": ["requesterUid"],
                "properties": { "requesterUid": { "type": "string" } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();
        let output = Schema::new("secret.output", json!({ "type": "object" }), UnknownFields::Passthrough)
            .unwrap();
        let flag = ran.clone();
        let flow = FlowDefinition::new(
            "secret",
            input,
            output,
            handler_fn(move |_ctx: FlowContext, _input: Value| {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok::<_, HandlerError>(json!({}))
                }
            }),
        )
        .privileged();
        let runner = runner_with(flow);

        let err = runner
            .run("secret", json!({ "requesterUid": "ghost" }))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::IdentityNotFound(_)));
        assert!(!ran.load(Ordering::SeqCst));

        let output = runner
            .run("secret", json!({ "requesterUid": "admin-1" }))
            .await
            .unwrap();
        assert_eq!(output, json!({}));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_malformed_output_fails_loudly() {
        let input = Schema::new("bad.input", json!({ "type": "object" }), UnknownFields::Strip).unwrap();
        let output = Schema::new(
            "bad.output",
            json!({
                "type": "object",
                "required": ["answer"],
                "properties": { "answer": { "type": "string" } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();
        let flow = FlowDefinition::new(
            "bad",
            input,
            output,
            handler_fn(|_ctx: FlowContext, _input: Value| async {
                Ok::<_, HandlerError>(json!({ "answer": 42 }))
            }),
        );
        let runner = runner_with(flow);

        let err = runner.run("bad", json!({})).await.unwrap_err();
        match err {
            FlowError::InvalidOutput { flow, source } => {
                assert_eq!(flow, "bad");
                assert_eq!(source.paths(), vec!["answer"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handler_error_policies() {
        let input = Schema::new("fail.input", json!({ "type": "object" }), UnknownFields::Strip).unwrap();
        let output = Schema::new(
            "fail.output",
            json!({
                "type": "object",
                "required": ["items"],
                "properties": { "items": { "type": "array" } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();
        let flow = FlowDefinition::new(
            "fail",
            input,
            output,
            handler_fn(|_ctx: FlowContext, _input: Value| async {
                Err::<Value, _>(HandlerError::Failed("store offline".into()))
            }),
        )
        .return_empty_on_error(json!({ "items": [] }));

        let mut registry = FlowRegistry::new();
        registry.register(flow).unwrap();
        let runner = FlowRunner::new(registry, guard(), services());
        assert_eq!(runner.run("fail", json!({})).await.unwrap(), json!({ "items": [] }));

        let input = Schema::new("fail.input", json!({ "type": "object" }), UnknownFields::Strip).unwrap();
        let output = Schema::new("fail.output", json!({ "type": "object" }), UnknownFields::Strip).unwrap();
        let flow = FlowDefinition::new(
            "fail",
            input,
            output,
            handler_fn(|_ctx: FlowContext, _input: Value| async {
                Err::<Value, _>(HandlerError::Failed("store offline".into()))
            }),
        );
        let runner = runner_with(flow);
        let err = runner.run("fail", json!({})).await.unwrap_err();
        assert!(matches!(err, FlowError::Handler { .. }));
    }
}
