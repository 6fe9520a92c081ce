//! Flock health diagnosis
//!
//! The provider's structured diagnosis is returned exactly as produced once
//! it satisfies the output schema. Extra fields are passed through.

use henhouse_genai::PromptTemplate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{generate, input_schema, output_schema};
use crate::flow::{handler_fn, FlowContext, FlowDefinition, HandlerError};
use crate::schema::{SchemaError, UnknownFields};

const NAME: &str = "diagnose-health";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub symptoms: String,
    pub flock_age_days: u32,
    /// Image as a `data:` URI
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
}

fn template() -> PromptTemplate {
    PromptTemplate::new(
        NAME,
        "Diagnose the likely health problems of a poultry flock.\n\n\
         Symptoms: {{symptoms}}\n\
         Flock age: {{flockAgeDays}} days\n\
         If a photo of the birds is attached, use it.\n\n\
         Return an object with:\n\
         - \"possibleDiseases\": list of {\"name\", \"likelihood\" (High, Medium or Low), \"reasoning\"}\n\
         - \"treatmentPlan\": list of {\"step\", \"details\"}\n\
         - \"preventativeMeasures\": list of strings\n\
         - \"regionSpecificAdvice\": string",
    )
    .with_image("photo")
    .with_system(
        "You are a poultry veterinarian. Be cautious and recommend a vet visit \
         for serious cases. Respond with JSON only.",
    )
}

async fn diagnose(ctx: FlowContext, input: HealthReport) -> Result<Value, HandlerError> {
    generate(&ctx, &template(), &input).await
}

pub fn diagnose_health() -> Result<FlowDefinition, SchemaError> {
    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["symptoms", "flockAgeDays"],
                "properties": {
                    "symptoms": { "type": "string", "minLength": 1 },
                    "flockAgeDays": { "type": "integer", "minimum": 0, "maximum": u32::MAX, "coerce": true },
                    "photo": { "type": "string", "pattern": "^data:image/[A-Za-z0-9.+-]+;base64," }
                }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": [
                    "possibleDiseases",
                    "treatmentPlan",
                    "preventativeMeasures",
                    "regionSpecificAdvice"
                ],
                "properties": {
                    "possibleDiseases": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "likelihood", "reasoning"],
                            "properties": {
                                "name": { "type": "string" },
                                "likelihood": { "enum": ["High", "Medium", "Low"] },
                                "reasoning": { "type": "string" }
                            }
                        }
                    },
                    "treatmentPlan": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["step", "details"],
                            "properties": {
                                "step": { "type": "string" },
                                "details": { "type": "string" }
                            }
                        }
                    },
                    "preventativeMeasures": { "type": "array", "items": { "type": "string" } },
                    "regionSpecificAdvice": { "type": "string" }
                }
            }),
            UnknownFields::Passthrough,
        )?,
        handler_fn(diagnose),
    ))
}
