use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Id reported when no configured rule matched.
pub const DEFAULT_RULE_ID: &str = "DEFAULT";

/// Topic tag attached to a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum Category {
    Appointment,
    HealthStatus,
    Emergency,
    Medication,
    Records,
    Vitals,
    LabResults,
    Imaging,
    Immunization,
    General,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Appointment => "Appointment",
            Category::HealthStatus => "HealthStatus",
            Category::Emergency => "Emergency",
            Category::Medication => "Medication",
            Category::Records => "Records",
            Category::Vitals => "Vitals",
            Category::LabResults => "LabResults",
            Category::Imaging => "Imaging",
            Category::Immunization => "Immunization",
            Category::General => "General",
        };
        f.write_str(name)
    }
}

/// Severity label. Ordered `Low < Medium < High`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Lenient parse used for free-form labels coming back from a language model.
    pub fn parse_loose(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(name)
    }
}

/// A keyword-triggered mapping from input text to a category, risk level and
/// canned responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClassificationRule {
    pub id: String,
    /// Lowercase substrings; any one of them matching selects the rule.
    pub keywords: Vec<String>,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub responses: Vec<String>,
    /// Higher is tested first. Ties keep declaration order.
    #[serde(default)]
    pub priority: i32,
}

/// Fallback entry of a rule set, used when nothing matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DefaultRule {
    pub category: Category,
    pub risk_level: RiskLevel,
    pub responses: Vec<String>,
}

impl Default for DefaultRule {
    fn default() -> Self {
        Self {
            category: Category::General,
            risk_level: RiskLevel::Low,
            responses: vec!["Please clarify your question".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    pub text: String,
    /// Display-only passthrough (age, gender, medical history). Never used for matching.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ClassificationRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub matched_rule_id: String,
    pub category: Category,
    pub risk_level: RiskLevel,
    pub responses: Vec<String>,
}

impl ClassificationResult {
    pub fn is_default(&self) -> bool {
        self.matched_rule_id == DEFAULT_RULE_ID
    }
}

impl From<&ClassificationRule> for ClassificationResult {
    fn from(rule: &ClassificationRule) -> Self {
        Self {
            matched_rule_id: rule.id.clone(),
            category: rule.category,
            risk_level: rule.risk_level,
            responses: rule.responses.clone(),
        }
    }
}

impl From<&DefaultRule> for ClassificationResult {
    fn from(rule: &DefaultRule) -> Self {
        Self {
            matched_rule_id: DEFAULT_RULE_ID.to_string(),
            category: rule.category,
            risk_level: rule.risk_level,
            responses: rule.responses.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_serializes_with_camel_case_fields() {
        let result = ClassificationResult {
            matched_rule_id: "r1".to_string(),
            category: Category::Appointment,
            risk_level: RiskLevel::Low,
            responses: vec!["Navigate to scheduling".to_string()],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["matchedRuleId"], "r1");
        assert_eq!(json["category"], "Appointment");
        assert_eq!(json["riskLevel"], "Low");
        assert_eq!(json["responses"][0], "Navigate to scheduling");
    }

    #[test]
    fn request_attributes_are_optional() {
        let req: ClassificationRequest = serde_json::from_str(r#"{"text":"fever"}"#).unwrap();
        assert_eq!(req.text, "fever");
        assert!(req.attributes.is_empty());

        let req: ClassificationRequest =
            serde_json::from_str(r#"{"text":"x","attributes":{"age":"41"}}"#).unwrap();
        assert_eq!(req.attributes.get("age").map(String::as_str), Some("41"));
    }

    #[test]
    fn risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }

    #[test]
    fn loose_risk_parse() {
        assert_eq!(RiskLevel::parse_loose(" HIGH "), Some(RiskLevel::High));
        assert_eq!(RiskLevel::parse_loose("Moderate"), Some(RiskLevel::Medium));
        assert_eq!(RiskLevel::parse_loose("severe"), None);
    }
}
