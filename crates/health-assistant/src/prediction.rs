/// Health prediction: a passthrough to an OpenAI-compatible chat model with
/// a rule-based fallback.
///
/// The symptom text is triaged with the chat rule book first. The model is
/// asked for a JSON assessment; when its reply cannot be parsed, the triage
/// result supplies the recommendations and risk level instead.
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use dockyard_common::openai::{ChatCompletionRequest, Message, OpenAiClient};
use triage_engine::{classify_text, ClassificationResult, RiskLevel, RuleSet};

use crate::error::AppError;
use crate::rate_limit::RateLimiter;

const NOT_PROVIDED: &str = "Not provided";
const TEMPERATURE: f32 = 0.3;
const SYSTEM_PROMPT: &str = "You are a medical AI assistant. Provide health insights based on \
the data provided. Always respond with valid JSON format. Be professional and provide \
actionable advice.";

const DEFAULT_POSSIBLE_CONDITIONS: [&str; 3] = [
    "Based on symptoms analysis",
    "Requires professional evaluation",
    "Multiple factors considered",
];
const DEFAULT_PRECAUTIONS: [&str; 3] = [
    "Maintain proper hygiene",
    "Stay hydrated",
    "Get adequate rest",
];
const DEFAULT_MEDICATIONS: [&str; 3] = [
    "Consult healthcare provider for proper medication",
    "Over-the-counter pain relief if needed",
    "Follow prescribed treatment plan",
];

/// Vital signs and demographics. Values may arrive as strings or numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vitals {
    pub blood_pressure: Option<Value>,
    pub heart_rate: Option<Value>,
    pub temperature: Option<Value>,
    pub weight: Option<Value>,
    pub height: Option<Value>,
    pub age: Option<Value>,
    pub gender: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lifestyle {
    pub exercise: Option<Value>,
    pub sleep: Option<Value>,
    pub stress: Option<Value>,
    pub diet: Option<Value>,
    pub symptoms: Option<Value>,
    pub medical_history: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRequest {
    #[serde(default)]
    pub vitals: Vitals,
    #[serde(default)]
    pub lifestyle: Lifestyle,
    #[serde(default)]
    pub lab_results: Option<Value>,
}

impl PredictionRequest {
    /// Free-text symptoms used for triage; empty when absent.
    pub fn symptoms(&self) -> String {
        match &self.lifestyle.symptoms {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthPrediction {
    pub overall_health: String,
    pub health_score: u8,
    pub risk_factors: Vec<String>,
    pub recommendations: Vec<String>,
    pub risk_level: RiskLevel,
    pub possible_conditions: Vec<String>,
    pub precautions: Vec<String>,
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    #[serde(flatten)]
    pub prediction: HealthPrediction,
    pub source: PredictionSource,
    pub triage: ClassificationResult,
}

/// The JSON shape requested from the model. Only the first two keys are required.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelAssessment {
    overall_health: String,
    #[serde(deserialize_with = "number_or_numeric_string")]
    health_score: f64,
    #[serde(default)]
    risk_factors: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    possible_conditions: Option<Vec<String>>,
    #[serde(default)]
    precautions: Option<Vec<String>>,
    #[serde(default)]
    medications: Option<Vec<String>>,
}

/// Models sometimes quote the score (`"82"`); accept either form.
fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let score = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    score
        .filter(|v| v.is_finite())
        .ok_or_else(|| de::Error::custom(format!("healthScore is not numeric: {value}")))
}

fn display(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_PROVIDED.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => NOT_PROVIDED.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn build_prompt(request: &PredictionRequest) -> String {
    let v = &request.vitals;
    let l = &request.lifestyle;
    let lab_results = match &request.lab_results {
        None | Some(Value::Null) => NOT_PROVIDED.to_string(),
        Some(value) => value.to_string(),
    };

    format!(
        "As a medical AI assistant, analyze the following health data and provide insights:

Patient:
- Age: {age}
- Gender: {gender}

Vital Signs:
- Blood Pressure: {bp}
- Heart Rate: {hr} bpm
- Temperature: {temp}°F
- Weight: {weight} lbs
- Height: {height}

Lifestyle Factors:
- Exercise: {exercise} minutes/day
- Sleep: {sleep} hours/night
- Stress Level: {stress}/10
- Diet Quality: {diet}/10

Reported Symptoms: {symptoms}
Medical History: {history}

Lab Results: {lab_results}

Please provide:
1. Overall health assessment (Excellent, Good, Fair, Poor)
2. Health score (0-100)
3. Top 3 risk factors (if any)
4. Top 3 specific, actionable recommendations
5. Risk level (Low, Medium, High)

Format your response as JSON with these exact keys:
{{
  \"overallHealth\": \"string\",
  \"healthScore\": number,
  \"riskFactors\": [\"string1\", \"string2\", \"string3\"],
  \"recommendations\": [\"string1\", \"string2\", \"string3\"],
  \"riskLevel\": \"string\"
}}
",
        age = display(&v.age),
        gender = display(&v.gender),
        bp = display(&v.blood_pressure),
        hr = display(&v.heart_rate),
        temp = display(&v.temperature),
        weight = display(&v.weight),
        height = display(&v.height),
        exercise = display(&l.exercise),
        sleep = display(&l.sleep),
        stress = display(&l.stress),
        diet = display(&l.diet),
        symptoms = display(&l.symptoms),
        history = display(&l.medical_history),
    )
}

/// Strip a surrounding markdown code fence, if the model added one.
fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest.strip_prefix("json").unwrap_or(rest),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_reply(reply: &str) -> Result<ModelAssessment, serde_json::Error> {
    serde_json::from_str(strip_code_fence(reply))
}

fn enhance(assessment: ModelAssessment, triage: &ClassificationResult) -> HealthPrediction {
    let risk_level = assessment
        .risk_level
        .as_deref()
        .and_then(RiskLevel::parse_loose)
        .unwrap_or(triage.risk_level);

    let precautions = assessment.precautions.unwrap_or_else(|| {
        if assessment.recommendations.is_empty() {
            to_strings(&DEFAULT_PRECAUTIONS)
        } else {
            assessment.recommendations.iter().take(3).cloned().collect()
        }
    });

    HealthPrediction {
        overall_health: assessment.overall_health,
        health_score: assessment.health_score.clamp(0.0, 100.0).round() as u8,
        risk_factors: assessment.risk_factors,
        recommendations: assessment.recommendations,
        risk_level,
        possible_conditions: assessment
            .possible_conditions
            .unwrap_or_else(|| to_strings(&DEFAULT_POSSIBLE_CONDITIONS)),
        precautions,
        medications: assessment
            .medications
            .unwrap_or_else(|| to_strings(&DEFAULT_MEDICATIONS)),
    }
}

/// Prediction used when the model reply is unusable.
pub fn fallback_prediction(triage: &ClassificationResult) -> HealthPrediction {
    enhance(
        ModelAssessment {
            overall_health: "Good".to_string(),
            health_score: 75.0,
            risk_factors: vec!["Insufficient data for detailed analysis".to_string()],
            recommendations: triage.responses.clone(),
            risk_level: Some(triage.risk_level.to_string()),
            possible_conditions: None,
            precautions: None,
            medications: None,
        },
        triage,
    )
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub struct Predictor {
    openai: Arc<OpenAiClient>,
    model: String,
    rules: Arc<RuleSet>,
    limiter: Option<RateLimiter>,
}

impl Predictor {
    pub fn new(
        openai: Arc<OpenAiClient>,
        model: String,
        rules: Arc<RuleSet>,
        limiter: Option<RateLimiter>,
    ) -> Self {
        Self {
            openai,
            model,
            rules,
            limiter,
        }
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, AppError> {
        if let Some(limiter) = &self.limiter {
            limiter.check().await?;
        }

        let triage = classify_text(&request.symptoms(), &self.rules);

        let chat = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(build_prompt(request)),
            ],
            temperature: Some(TEMPERATURE),
            max_tokens: None,
        };
        let response = self.openai.chat_completions(chat, None).await?;

        if let Some(usage) = &response.usage {
            info!(
                model = %self.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "prediction completed"
            );
        }

        let parsed = match response.first_content() {
            Some(reply) => parse_reply(reply).map_err(|e| e.to_string()),
            None => Err("reply has no message content".to_string()),
        };

        let (prediction, source) = match parsed {
            Ok(assessment) => (enhance(assessment, &triage), PredictionSource::Model),
            Err(reason) => {
                warn!(
                    error = %reason,
                    triage_rule = %triage.matched_rule_id,
                    "model reply unusable, using fallback prediction"
                );
                (fallback_prediction(&triage), PredictionSource::Fallback)
            }
        };

        Ok(PredictionResponse {
            prediction,
            source,
            triage,
        })
    }
}
