//! Mock generative provider for testing.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::template::PromptTemplate;
use crate::traits::{GenerationError, GenerativeProvider};

/// Mock provider for testing.
///
/// Returns a fixed payload (optionally per template name). Templates are
/// still rendered, so a flow that forgets a required variable fails here
/// the same way it would against a real provider.
pub struct MockProvider {
    provider_id: String,
    available: AtomicBool,
    default_response: Value,
    responses: HashMap<String, Value>,
    call_count: AtomicU32,
}

impl MockProvider {
    /// Create a new mock provider.
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            available: AtomicBool::new(true),
            default_response: Value::Object(Default::default()),
            responses: HashMap::new(),
            call_count: AtomicU32::new(0),
        }
    }

    /// Set the payload returned for any template without a specific response.
    pub fn with_response(mut self, response: Value) -> Self {
        self.default_response = response;
        self
    }

    /// Set the payload returned for one template name.
    pub fn with_template_response(mut self, template: impl Into<String>, response: Value) -> Self {
        self.responses.insert(template.into(), response);
        self
    }

    /// Set availability.
    pub fn with_available(self, available: bool) -> Self {
        self.available.store(available, Ordering::SeqCst);
        self
    }

    /// Get the number of times generate was called.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Reset the call count.
    pub fn reset_call_count(&self) {
        self.call_count.store(0, Ordering::SeqCst);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("mock-provider")
    }
}

#[async_trait]
impl GenerativeProvider for MockProvider {
    fn id(&self) -> &str {
        &self.provider_id
    }

    async fn generate(
        &self,
        template: &PromptTemplate,
        variables: &Value,
    ) -> Result<Value, GenerationError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if !self.available.load(Ordering::SeqCst) {
            return Err(GenerationError::Unavailable(format!(
                "{} is disabled",
                self.provider_id
            )));
        }

        template.render_system(variables)?;
        template.render(variables)?;

        Ok(self
            .responses
            .get(template.name())
            .unwrap_or(&self.default_response)
            .clone())
    }
}
