//! Schema validation for flow inputs and outputs
//!
//! A [`Schema`] is a JSON Schema (Draft 7) document plus two fixed policies:
//!
//! - **Coercion**: a property annotated `"coerce": true` with type `number`
//!   or `integer` accepts a numeric string and converts it before checking.
//! - **Unknown fields**: each schema either strips undeclared object fields
//!   or passes them through. The policy belongs to the schema, never to the
//!   call site.
//!
//! Validation returns the (possibly coerced/stripped) value or a
//! [`ValidationError`] listing every offending field path.

use jsonschema::{error::ValidationErrorKind, Draft, JSONSchema};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use std::fmt;

/// What to do with object fields the schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownFields {
    /// Remove undeclared fields before validation
    Strip,
    /// Keep undeclared fields untouched
    Passthrough,
}

/// One failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    /// Dotted path to the field (`""` for the root value)
    pub path: String,
    /// What was wrong with it
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A value failed its schema.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{schema} validation failed: {}", format_issues(.issues))]
pub struct ValidationError {
    /// Name of the schema that rejected the value
    pub schema: String,
    /// Every failing field
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    /// Paths of all failing fields.
    pub fn paths(&self) -> Vec<&str> {
        self.issues.iter().map(|i| i.path.as_str()).collect()
    }
}

fn format_issues(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The schema document itself could not be compiled.
#[derive(Debug, thiserror::Error)]
#[error("Invalid schema '{name}': {reason}")]
pub struct SchemaError {
    pub name: String,
    pub reason: String,
}

/// A compiled schema with fixed coercion and unknown-field policies.
pub struct Schema {
    name: String,
    document: Value,
    compiled: JSONSchema,
    unknown_fields: UnknownFields,
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("unknown_fields", &self.unknown_fields)
            .finish()
    }
}

impl Schema {
    /// Compile a schema document.
    pub fn new(
        name: impl Into<String>,
        document: Value,
        unknown_fields: UnknownFields,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&document)
            .map_err(|e| SchemaError {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            name,
            document,
            compiled,
            unknown_fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn unknown_fields(&self) -> UnknownFields {
        self.unknown_fields
    }

    /// Validate `value`, returning the normalized value on success.
    pub fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        let prepared = prepare(&self.document, value, self.unknown_fields);

        let issues: Vec<FieldIssue> = match self.compiled.validate(&prepared) {
            Ok(()) => Vec::new(),
            Err(errors) => errors
                .map(|error| {
                    let mut path = pointer_to_path(&error.instance_path.to_string());
                    if let ValidationErrorKind::Required { property } = &error.kind {
                        let field = property
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| property.to_string());
                        path = join_path(&path, &field);
                    }
                    FieldIssue {
                        path,
                        message: error.to_string(),
                    }
                })
                .collect(),
        };

        if issues.is_empty() {
            Ok(prepared)
        } else {
            Err(ValidationError {
                schema: self.name.clone(),
                issues,
            })
        }
    }
}

/// Apply coercions and the unknown-field policy, guided by the schema.
fn prepare(schema: &Value, value: Value, unknown: UnknownFields) -> Value {
    match value {
        Value::String(s) if wants_coercion(schema) => coerce_numeric(schema, s),
        Value::Number(n) if is_integer_type(schema) => whole_number(n),
        Value::Object(map) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return Value::Object(map);
            };
            let mut out = Map::with_capacity(map.len());
            for (key, field) in map {
                match properties.get(&key) {
                    Some(field_schema) => {
                        out.insert(key, prepare(field_schema, field, unknown));
                    }
                    None if unknown == UnknownFields::Passthrough => {
                        out.insert(key, field);
                    }
                    None => {}
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => match schema.get("items") {
            Some(item_schema) if item_schema.is_object() => Value::Array(
                items
                    .into_iter()
                    .map(|item| prepare(item_schema, item, unknown))
                    .collect(),
            ),
            _ => Value::Array(items),
        },
        other => other,
    }
}

fn wants_coercion(schema: &Value) -> bool {
    schema.get("coerce").and_then(Value::as_bool).unwrap_or(false)
}

fn is_integer_type(schema: &Value) -> bool {
    schema.get("type").and_then(Value::as_str) == Some("integer")
}

/// `21.0` becomes `21`, so integer fields reach handlers as JSON integers.
fn whole_number(n: Number) -> Value {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            Value::Number((f as i64).into())
        }
        _ => Value::Number(n),
    }
}

fn coerce_numeric(schema: &Value, raw: String) -> Value {
    let trimmed = raw.trim();
    let integer_only = is_integer_type(schema);

    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Number(i.into());
    }
    if let Some(n) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return if integer_only { whole_number(n) } else { Value::Number(n) };
    }
    // Leave it as a string; the type check reports it.
    Value::String(raw)
}

fn pointer_to_path(pointer: &str) -> String {
    pointer
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect::<Vec<_>>()
        .join(".")
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{}.{}", parent, field)
    }
}
