//! Farming advisory flows
//!
//! Open flows answering questions and giving feed and management advice
//! from flock metrics. Numeric inputs accept numeric strings, as submitted
//! by form fields.

use henhouse_genai::PromptTemplate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{generate, input_schema, output_schema};
use crate::flow::{handler_fn, FlowContext, FlowDefinition, HandlerError};
use crate::schema::{SchemaError, UnknownFields};

const ADVISOR_SYSTEM: &str = "You are an experienced poultry farming advisor. \
Answer practically for small and mid-sized farms. Respond with JSON only.";

#[derive(Debug, Serialize, Deserialize)]
pub struct Question {
    pub query: String,
}

async fn answer(ctx: FlowContext, input: Question) -> Result<Value, HandlerError> {
    let template = PromptTemplate::new(
        "answer-question",
        "Answer the farmer's question.\n\nQuestion: {{query}}\n\n\
         Return an object with a single string field \"answer\".",
    )
    .with_system(ADVISOR_SYSTEM);
    generate(&ctx, &template, &input).await
}

pub fn answer_question() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "answer-question";
    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["query"],
                "properties": { "query": { "type": "string", "minLength": 1 } }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["answer"],
                "properties": { "answer": { "type": "string" } }
            }),
            UnknownFields::Strip,
        )?,
        handler_fn(answer),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMetrics {
    pub production_rate: f64,
    pub mortality_rate: f64,
    pub feed_consumption: f64,
    pub chicken_age_weeks: u32,
    pub environmental_conditions: String,
}

async fn recommend(ctx: FlowContext, input: FeedMetrics) -> Result<Value, HandlerError> {
    let template = PromptTemplate::new(
        "recommend-feed",
        "Recommend a feed plan for this flock.\n\n\
         Egg production rate: {{productionRate}}%\n\
         Mortality rate: {{mortalityRate}}%\n\
         Feed consumption: {{feedConsumption}} kg/day\n\
         Age: {{chickenAgeWeeks}} weeks\n\
         Environment: {{environmentalConditions}}\n\n\
         Return an object with string fields \"recommendation\" and \"reasoning\".",
    )
    .with_system(ADVISOR_SYSTEM);
    generate(&ctx, &template, &input).await
}

pub fn recommend_feed() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "recommend-feed";
    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": [
                    "productionRate",
                    "mortalityRate",
                    "feedConsumption",
                    "chickenAgeWeeks",
                    "environmentalConditions"
                ],
                "properties": {
                    "productionRate": { "type": "number", "minimum": 0, "coerce": true },
                    "mortalityRate": { "type": "number", "minimum": 0, "coerce": true },
                    "feedConsumption": { "type": "number", "minimum": 0, "coerce": true },
                    "chickenAgeWeeks": { "type": "integer", "minimum": 0, "maximum": u32::MAX, "coerce": true },
                    "environmentalConditions": { "type": "string" }
                }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["recommendation", "reasoning"],
                "properties": {
                    "recommendation": { "type": "string" },
                    "reasoning": { "type": "string" }
                }
            }),
            UnknownFields::Strip,
        )?,
        handler_fn(recommend),
    ))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmMetrics {
    pub production_rate: f64,
    pub mortality_rate: f64,
    pub feed_consumption: f64,
    pub farm_size: f64,
}

async fn suggest(ctx: FlowContext, input: FarmMetrics) -> Result<Value, HandlerError> {
    let template = PromptTemplate::new(
        "suggest-improvements",
        "Suggest improvements for this farm.\n\n\
         Egg production rate: {{productionRate}}%\n\
         Mortality rate: {{mortalityRate}}%\n\
         Feed consumption: {{feedConsumption}} kg/day\n\
         Flock size: {{farmSize}} birds\n\n\
         Return an object with a single string field \"suggestions\".",
    )
    .with_system(ADVISOR_SYSTEM);
    generate(&ctx, &template, &input).await
}

pub fn suggest_improvements() -> Result<FlowDefinition, SchemaError> {
    const NAME: &str = "suggest-improvements";
    Ok(FlowDefinition::new(
        NAME,
        input_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["productionRate", "mortalityRate", "feedConsumption", "farmSize"],
                "properties": {
                    "productionRate": { "type": "number", "minimum": 0, "coerce": true },
                    "mortalityRate": { "type": "number", "minimum": 0, "coerce": true },
                    "feedConsumption": { "type": "number", "minimum": 0, "coerce": true },
                    "farmSize": { "type": "number", "minimum": 0, "coerce": true }
                }
            }),
        )?,
        output_schema(
            NAME,
            json!({
                "type": "object",
                "required": ["suggestions"],
                "properties": { "suggestions": { "type": "string" } }
            }),
            UnknownFields::Strip,
        )?,
        handler_fn(suggest),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_input_accepts_form_strings() {
        let flow = recommend_feed().unwrap();
        let input = flow
            .input_schema()
            .validate(json!({
                "productionRate": "85.5",
                "mortalityRate": "2",
                "feedConsumption": 110,
                "chickenAgeWeeks": "30",
                "environmentalConditions": "hot and humid"
            }))
            .unwrap();

        assert_eq!(input["productionRate"], json!(85.5));
        assert_eq!(input["chickenAgeWeeks"], json!(30));

        let metrics: FeedMetrics = serde_json::from_value(input).unwrap();
        assert_eq!(metrics.chicken_age_weeks, 30);
    }

    #[test]
    fn test_feed_input_rejects_non_numeric() {
        let flow = recommend_feed().unwrap();
        let err = flow
            .input_schema()
            .validate(json!({
                "productionRate": "lots",
                "mortalityRate": 2,
                "feedConsumption": 110,
                "chickenAgeWeeks": 30,
                "environmentalConditions": "dry"
            }))
            .unwrap_err();
        assert_eq!(err.paths(), vec!["productionRate"]);
    }

    #[test]
    fn test_question_requires_text() {
        let flow = answer_question().unwrap();
        assert!(flow.input_schema().validate(json!({ "query": "" })).is_err());
        assert!(flow.input_schema().validate(json!({})).is_err());
    }

    #[test]
    fn test_answer_output_strips_extras() {
        let flow = answer_question().unwrap();
        let output = flow
            .output_schema()
            .validate(json!({ "answer": "Add oyster shell.", "confidence": 0.9 }))
            .unwrap();
        assert_eq!(output, json!({ "answer": "Add oyster shell." }));
    }
}
