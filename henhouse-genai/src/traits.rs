//! Core trait for generative-text providers.
//!
//! Flows see the provider as a single opaque capability: render a prompt
//! template with variables, get structured JSON back.

use async_trait::async_trait;
use serde_json::Value;

use crate::template::PromptTemplate;

/// Error types for generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Provider is not available
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// Template references a variable that was not supplied
    #[error("Template '{template}' is missing variable '{variable}'")]
    MissingVariable { template: String, variable: String },

    /// Request failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Rate limited by the provider
    #[error("Rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    /// Network error
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Provider output was not structured JSON
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Generative-text capability consumed by flows.
///
/// Implementations must return a JSON value; shaping it into the flow's
/// output contract is the flow runner's job, not the provider's.
#[async_trait]
pub trait GenerativeProvider: Send + Sync {
    /// Provider identifier (e.g., model name).
    fn id(&self) -> &str;

    /// Render `template` with `variables` and return the structured output.
    async fn generate(
        &self,
        template: &PromptTemplate,
        variables: &Value,
    ) -> Result<Value, GenerationError>;
}
