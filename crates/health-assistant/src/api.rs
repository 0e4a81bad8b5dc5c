use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use triage_engine::{Category, ClassificationResult, DefaultRule, RiskLevel, RuleSet};

/// Upper bound on texts per batch call.
pub const MAX_BATCH_TEXTS: usize = 100;

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ClassifyBatchParams {
    /// Texts to classify independently; results keep this order (max 100).
    pub texts: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClassifyBatchResponse {
    pub results: Vec<ClassificationResult>,
}

/// Findings for one document; each matching section contributes a result.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocumentInsightsResponse {
    /// Matched sections in evaluation order, or the default result alone.
    pub sections: Vec<ClassificationResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: String,
    pub keywords: Vec<String>,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RuleListResponse {
    /// Rules in evaluation order.
    pub rules: Vec<RuleSummary>,
    pub default: DefaultRule,
}

impl RuleListResponse {
    pub fn from_rules(rules: &RuleSet) -> Self {
        Self {
            rules: rules
                .evaluation_order()
                .map(|r| RuleSummary {
                    id: r.id.clone(),
                    keywords: r.keywords.clone(),
                    category: r.category,
                    risk_level: r.risk_level,
                    priority: r.priority,
                })
                .collect(),
            default: rules.default_rule().clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub rules: usize,
    pub document_rules: usize,
}
