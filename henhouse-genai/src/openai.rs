//! OpenAI-compatible generative provider.
//!
//! Works with any OpenAI-compatible chat completions API (OpenAI, vLLM,
//! Ollama, LocalAI). Requests JSON output and parses the first choice.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::template::PromptTemplate;
use crate::traits::{GenerationError, GenerativeProvider};

/// OpenAI-compatible provider.
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GenerationError::Unavailable(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            temperature: None,
        })
    }

    /// Set sampling temperature (clamped to 0.0-2.0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature.clamp(0.0, 2.0));
        self
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn auth_header(&self) -> Option<String> {
        self.api_key.as_ref().map(|k| format!("Bearer {}", k))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: MessageContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

/// Plain text when there are no images, content parts otherwise.
fn user_content(text: String, images: Vec<String>) -> MessageContent {
    if images.is_empty() {
        return MessageContent::Text(text);
    }
    let mut parts = vec![ContentPart::Text { text }];
    parts.extend(
        images
            .into_iter()
            .map(|url| ContentPart::ImageUrl { image_url: ImageUrl { url } }),
    );
    MessageContent::Parts(parts)
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

#[async_trait]
impl GenerativeProvider for OpenAiProvider {
    fn id(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        template: &PromptTemplate,
        variables: &Value,
    ) -> Result<Value, GenerationError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = template.render_system(variables)? {
            messages.push(ChatMessage {
                role: "system",
                content: MessageContent::Text(system),
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user_content(template.render(variables)?, template.images(variables)),
        });

        let chat_request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
            stream: false,
        };

        debug!(template = template.name(), model = %self.model, "Sending generation request");

        let mut http_request = self.client.post(self.chat_completions_url());
        if let Some(auth) = self.auth_header() {
            http_request = http_request.header(header::AUTHORIZATION, auth);
        }

        let response = http_request
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(GenerationError::RateLimited {
                    retry_after_ms: None,
                });
            }

            return Err(GenerationError::RequestFailed(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GenerationError::ParseError("No content in response".to_string()))?;

        parse_structured(&content)
    }
}

/// Parse model output as JSON, tolerating a fenced code block around it.
fn parse_structured(content: &str) -> Result<Value, GenerationError> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .unwrap_or(trimmed);

    serde_json::from_str(unfenced.trim())
        .map_err(|e| GenerationError::ParseError(format!("Output is not JSON: {}", e)))
}
