//! Henhouse GenAI - generative-text provider capability
//!
//! Flows consume text generation as one opaque operation:
//! `generate(template, variables) -> structured JSON`.
//!
//! - [`GenerativeProvider`]: the capability trait
//! - [`PromptTemplate`]: named prompt with `{{variable}}` placeholders
//! - [`OpenAiProvider`]: OpenAI-compatible HTTP backend (JSON mode)
//! - [`MockProvider`]: fixed-payload provider for tests

pub mod mock;
pub mod openai;
pub mod template;
pub mod traits;

pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use template::PromptTemplate;
pub use traits::{GenerationError, GenerativeProvider};
