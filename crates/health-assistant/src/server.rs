/// MCP tool server for the health assistant.
///
/// Exposes five tools:
/// - `classify_message`: triage a chat message against the chat rule book
/// - `classify_batch`: triage many texts in one call
/// - `classify_document`: findings for every section matched in document text
/// - `list_rules`: show the chat rule table in evaluation order
/// - `predict_health`: model-backed health prediction with rule-based fallback
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tracing::info;

use triage_engine::{classify, ClassificationRequest, ClassificationResult};

use crate::api::{
    ClassifyBatchParams, ClassifyBatchResponse, DocumentInsightsResponse, RuleListResponse,
};
use crate::prediction::{PredictionRequest, PredictionResponse};
use crate::state::AppState;

#[derive(Clone)]
pub struct HealthAssistantServer {
    state: AppState,
    tool_router: ToolRouter<HealthAssistantServer>,
}

impl HealthAssistantServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl HealthAssistantServer {
    #[tool(description = "Classify a chat message into a category, risk level and canned responses using the keyword rule book. Attributes (age, gender, medical history) are passed through and never change the result.")]
    async fn classify_message(
        &self,
        Parameters(params): Parameters<ClassificationRequest>,
    ) -> Result<Json<ClassificationResult>, String> {
        let result = classify(&params, &self.state.chat_rules);
        info!(rule = %result.matched_rule_id, category = %result.category, "message classified");
        Ok(Json(result))
    }

    #[tool(description = "Classify up to 100 texts independently against the chat rule book. Results keep the input order.")]
    async fn classify_batch(
        &self,
        Parameters(params): Parameters<ClassifyBatchParams>,
    ) -> Result<Json<ClassifyBatchResponse>, String> {
        let response = self
            .state
            .classify_batch(&params.texts)
            .map_err(|e| e.to_string())?;
        Ok(Json(response))
    }

    #[tool(description = "Analyze text extracted from an uploaded medical document. Every matching section (lab results, imaging, immunization) returns its key findings and recommendations.")]
    async fn classify_document(
        &self,
        Parameters(params): Parameters<ClassificationRequest>,
    ) -> Result<Json<DocumentInsightsResponse>, String> {
        let response = self.state.classify_document(&params.text);
        info!(sections = response.sections.len(), "document classified");
        Ok(Json(response))
    }

    #[tool(description = "List the chat classification rules in the order they are tested, plus the default result.")]
    async fn list_rules(&self) -> Result<Json<RuleListResponse>, String> {
        Ok(Json(RuleListResponse::from_rules(&self.state.chat_rules)))
    }

    #[tool(description = "Generate a health prediction (overall health, score, risk factors, recommendations, risk level) from vitals, lifestyle and lab results. Falls back to rule-based triage of the symptoms when the model reply is unusable.")]
    async fn predict_health(
        &self,
        Parameters(params): Parameters<PredictionRequest>,
    ) -> Result<Json<PredictionResponse>, String> {
        let response = self
            .state
            .predictor
            .predict(&params)
            .await
            .map_err(|e| format!("prediction failed: {e}"))?;
        Ok(Json(response))
    }
}

#[tool_handler]
impl ServerHandler for HealthAssistantServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "health-assistant".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Dockyard health assistant. Use classify_message for chat triage, \
classify_document for uploaded document text, and predict_health for a model-backed \
assessment. list_rules shows which keywords map to which category and risk level."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::HealthAssistantServer;

    #[test]
    fn tools_publish_output_schemas() {
        let tools = HealthAssistantServer::tool_router().list_all();
        for name in [
            "classify_message",
            "classify_batch",
            "classify_document",
            "list_rules",
            "predict_health",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }
}
