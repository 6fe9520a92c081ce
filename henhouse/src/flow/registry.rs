//! Flow registry
//!
//! Maps unique flow names to their definitions. Populated at startup,
//! read-only once handed to a [`FlowRunner`](crate::flow::FlowRunner).

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::flow::definition::{FlowDefinition, HandlerErrorPolicy};
use crate::schema::{SchemaError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Flow '{0}' is already registered")]
    Duplicate(String),

    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Flow '{0}' cannot return empty output: it defines none")]
    MissingEmptyOutput(String),

    #[error("Empty output of flow '{flow}' violates its output schema: {source}")]
    InvalidEmptyOutput {
        flow: String,
        source: ValidationError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Debug, Default)]
pub struct FlowRegistry {
    flows: BTreeMap<String, FlowDefinition>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in flow.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for flow in crate::flows::standard_flows()? {
            registry.register(flow)?;
        }
        info!(count = registry.len(), "Registered standard flows");
        Ok(registry)
    }

    /// Add a flow. Names must be unique, and a declared empty output must
    /// itself satisfy the output schema.
    pub fn register(&mut self, flow: FlowDefinition) -> Result<(), RegistryError> {
        if self.flows.contains_key(flow.name()) {
            return Err(RegistryError::Duplicate(flow.name().to_string()));
        }
        check_empty_output(&flow)?;

        debug!(
            flow = %flow.name(),
            privileged = flow.is_privileged(),
            policy = %flow.on_handler_error(),
            "Registered flow"
        );
        self.flows.insert(flow.name().to_string(), flow);
        Ok(())
    }

    /// Override a flow's handler-error policy.
    pub fn set_policy(&mut self, name: &str, policy: HandlerErrorPolicy) -> Result<(), RegistryError> {
        let flow = self
            .flows
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownFlow(name.to_string()))?;

        if policy == HandlerErrorPolicy::ReturnEmpty && flow.empty_output().is_none() {
            return Err(RegistryError::MissingEmptyOutput(name.to_string()));
        }

        info!(flow = %name, %policy, "Handler error policy overridden");
        flow.set_policy(policy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FlowDefinition> {
        self.flows.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.flows.contains_key(name)
    }

    /// Flows in name order.
    pub fn iter(&self) -> impl Iterator<Item = &FlowDefinition> {
        self.flows.values()
    }

    pub fn names(&self) -> Vec<&str> {
        self.flows.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}

fn check_empty_output(flow: &FlowDefinition) -> Result<(), RegistryError> {
    if let Some(empty) = flow.empty_output() {
        flow.output_schema()
            .validate(empty.clone())
            .map_err(|source| RegistryError::InvalidEmptyOutput {
                flow: flow.name().to_string(),
                source,
            })?;
    } else if flow.on_handler_error() == HandlerErrorPolicy::ReturnEmpty {
        return Err(RegistryError::MissingEmptyOutput(flow.name().to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::definition::{handler_fn, FlowContext};
    use crate::flow::error::HandlerError;
    use crate::schema::{Schema, UnknownFields};
    use serde_json::{json, Value};

    async fn echo(_ctx: FlowContext, input: Value) -> Result<Value, HandlerError> {
        Ok(input)
    }

    fn list_flow(name: &str) -> FlowDefinition {
        let input = Schema::new(
            format!("{name}.input"),
            json!({ "type": "object" }),
            UnknownFields::Passthrough,
        )
        .unwrap();
        let output = Schema::new(
            format!("{name}.output"),
            json!({
                "type": "object",
                "required": ["items"],
                "properties": { "items": { "type": "array" } }
            }),
            UnknownFields::Strip,
        )
        .unwrap();
        FlowDefinition::new(name, input, output, handler_fn(echo))
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = FlowRegistry::new();
        registry.register(list_flow("list-things")).unwrap();

        let err = registry.register(list_flow("list-things")).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(name) if name == "list-things"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_invalid_empty_output_rejected() {
        let mut registry = FlowRegistry::new();
        let flow = list_flow("list-things").return_empty_on_error(json!({ "items": "none" }));

        let err = registry.register(flow).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidEmptyOutput { .. }));
    }

    #[test]
    fn test_return_empty_requires_empty_output() {
        let mut registry = FlowRegistry::new();
        let flow = list_flow("list-things").with_policy(HandlerErrorPolicy::ReturnEmpty);
        assert!(matches!(
            registry.register(flow),
            Err(RegistryError::MissingEmptyOutput(_))
        ));

        registry.register(list_flow("list-things")).unwrap();
        assert!(matches!(
            registry.set_policy("list-things", HandlerErrorPolicy::ReturnEmpty),
            Err(RegistryError::MissingEmptyOutput(_))
        ));
    }

    #[test]
    fn test_set_policy() {
        let mut registry = FlowRegistry::new();
        registry
            .register(list_flow("list-things").return_empty_on_error(json!({ "items": [] })))
            .unwrap();

        registry
            .set_policy("list-things", HandlerErrorPolicy::Propagate)
            .unwrap();
        assert_eq!(
            registry.get("list-things").unwrap().on_handler_error(),
            HandlerErrorPolicy::Propagate
        );

        assert!(matches!(
            registry.set_policy("missing", HandlerErrorPolicy::Propagate),
            Err(RegistryError::UnknownFlow(_))
        ));
    }

    #[test]
    fn test_standard_registry() {
        let registry = FlowRegistry::standard().unwrap();
        for name in [
            "answer-question",
            "recommend-feed",
            "suggest-improvements",
            "diagnose-health",
            "list-all-users",
            "list-all-orders",
            "list-audit-logs",
            "update-user-status",
            "onboard-user",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
        assert!(registry.get("list-all-users").unwrap().is_privileged());
        assert!(!registry.get("diagnose-health").unwrap().is_privileged());
        assert_eq!(
            registry.get("update-user-status").unwrap().on_handler_error(),
            HandlerErrorPolicy::Propagate
        );
    }
}
