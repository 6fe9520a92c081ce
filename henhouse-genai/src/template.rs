//! Prompt templates with `{{variable}}` placeholders.
//!
//! Placeholders resolve against a JSON object of variables. Dotted paths
//! (`{{farm.size}}`) walk nested objects. A trailing `?` (`{{photo?}}`) marks
//! the variable optional; a missing optional renders as the empty string,
//! a missing required variable is an error.
//!
//! Image variables (`data:` URIs) are not rendered into the text. They are
//! attached to the request separately so providers can send them as images.

use serde_json::Value;

use crate::traits::GenerationError;

/// A named prompt with an optional system preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    name: String,
    system: Option<String>,
    body: String,
    images: Vec<String>,
}

impl PromptTemplate {
    /// Create a template from its name and body.
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: None,
            body: body.into(),
            images: Vec::new(),
        }
    }

    /// Add a system preamble. It is rendered with the same variables.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Attach the variable `variable` as an image when it is present.
    pub fn with_image(mut self, variable: impl Into<String>) -> Self {
        self.images.push(variable.into());
        self
    }

    /// Image URIs to attach, in declaration order. Absent variables are skipped.
    pub fn images(&self, variables: &Value) -> Vec<String> {
        self.images
            .iter()
            .filter_map(|key| lookup(variables, key))
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the system preamble, if any.
    pub fn render_system(&self, variables: &Value) -> Result<Option<String>, GenerationError> {
        self.system
            .as_deref()
            .map(|system| render(&self.name, system, variables))
            .transpose()
    }

    /// Render the body.
    pub fn render(&self, variables: &Value) -> Result<String, GenerationError> {
        render(&self.name, &self.body, variables)
    }
}

fn render(template: &str, text: &str, variables: &Value) -> Result<String, GenerationError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            // Unterminated placeholder is literal text.
            out.push_str(&rest[start..]);
            return Ok(out);
        };

        let raw = after[..end].trim();
        let (key, optional) = match raw.strip_suffix('?') {
            Some(key) => (key.trim(), true),
            None => (raw, false),
        };

        match lookup(variables, key) {
            Some(value) => out.push_str(&stringify(value)),
            None if optional => {}
            None => {
                return Err(GenerationError::MissingVariable {
                    template: template.to_string(),
                    variable: key.to_string(),
                })
            }
        }

        rest = &after[end + 2..];
    }

    out.push_str(rest);
    Ok(out)
}

fn lookup<'a>(variables: &'a Value, key: &str) -> Option<&'a Value> {
    let mut current = variables;
    for segment in key.split('.') {
        current = current.get(segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
