//! Built-in flows
//!
//! - Advisory: `answer-question`, `recommend-feed`, `suggest-improvements`
//! - Health: `diagnose-health`
//! - Administration: `list-all-users`, `list-all-orders`, `list-audit-logs`,
//!   `update-user-status`
//! - Onboarding: `onboard-user`

pub mod admin;
pub mod advisory;
pub mod diagnose;
pub mod onboarding;

use henhouse_genai::PromptTemplate;
use serde::Serialize;
use serde_json::Value;

use crate::flow::{FlowContext, FlowDefinition, HandlerError};
use crate::schema::{Schema, SchemaError, UnknownFields};

/// Every built-in flow definition.
pub fn standard_flows() -> Result<Vec<FlowDefinition>, SchemaError> {
    Ok(vec![
        advisory::answer_question()?,
        advisory::recommend_feed()?,
        advisory::suggest_improvements()?,
        diagnose::diagnose_health()?,
        admin::list_all_users()?,
        admin::list_all_orders()?,
        admin::list_audit_logs()?,
        admin::update_user_status()?,
        onboarding::onboard_user()?,
    ])
}

fn input_schema(flow: &str, document: Value) -> Result<Schema, SchemaError> {
    Schema::new(format!("{flow}.input"), document, UnknownFields::Strip)
}

fn output_schema(flow: &str, document: Value, unknown: UnknownFields) -> Result<Schema, SchemaError> {
    Schema::new(format!("{flow}.output"), document, unknown)
}

/// Render `template` with `variables` through the configured provider.
async fn generate<T: Serialize>(
    ctx: &FlowContext,
    template: &PromptTemplate,
    variables: &T,
) -> Result<Value, HandlerError> {
    let provider = ctx.services.provider()?;
    let variables =
        serde_json::to_value(variables).map_err(|e| HandlerError::Contract(e.to_string()))?;
    Ok(provider.generate(template, &variables).await?)
}
