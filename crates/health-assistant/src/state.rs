use std::sync::Arc;

use triage_engine::{classify_all, classify_batch, ClassificationResult, RuleSet};

use crate::api::{ClassifyBatchResponse, DocumentInsightsResponse, MAX_BATCH_TEXTS};
use crate::error::AppError;
use crate::prediction::Predictor;

/// Read-only state shared by the MCP and HTTP surfaces.
#[derive(Clone)]
pub struct AppState {
    pub chat_rules: Arc<RuleSet>,
    pub document_rules: Arc<RuleSet>,
    pub predictor: Arc<Predictor>,
}

impl AppState {
    pub fn new(chat_rules: Arc<RuleSet>, document_rules: Arc<RuleSet>, predictor: Predictor) -> Self {
        Self {
            chat_rules,
            document_rules,
            predictor: Arc::new(predictor),
        }
    }

    pub fn classify_batch(&self, texts: &[String]) -> Result<ClassifyBatchResponse, AppError> {
        if texts.len() > MAX_BATCH_TEXTS {
            return Err(AppError::InvalidRequest(format!(
                "at most {MAX_BATCH_TEXTS} texts per batch, got {}",
                texts.len()
            )));
        }
        let results: Vec<ClassificationResult> = classify_batch(texts, &self.chat_rules);
        Ok(ClassifyBatchResponse { results })
    }

    pub fn classify_document(&self, text: &str) -> DocumentInsightsResponse {
        DocumentInsightsResponse {
            sections: classify_all(text, &self.document_rules),
        }
    }
}
