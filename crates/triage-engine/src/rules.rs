/// Rule table loading and validation.
///
/// A rule book is a JSON document with an optional `default` entry and an
/// ordered `rules` array. Loading validates the table once; the resulting
/// `RuleSet` is immutable and can be shared across threads behind an `Arc`.
use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::RuleError;
use crate::model::{ClassificationRule, DefaultRule, DEFAULT_RULE_ID};

const CHAT_RULES: &str = include_str!("../rules/chat.json");
const DOCUMENT_RULES: &str = include_str!("../rules/documents.json");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleBook {
    #[serde(default)]
    default: DefaultRule,
    rules: Vec<ClassificationRule>,
}

#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<ClassificationRule>,
    /// Indices into `rules`, by descending priority then declaration order.
    order: Vec<usize>,
    default: DefaultRule,
}

impl RuleSet {
    /// Validate `rules` and build the evaluation order.
    ///
    /// Keywords are trimmed and lowercased so matching only has to normalize
    /// the input side.
    pub fn new(rules: Vec<ClassificationRule>, default: DefaultRule) -> Result<Self, RuleError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut normalized = Vec::with_capacity(rules.len());

        for (position, mut rule) in rules.into_iter().enumerate() {
            rule.id = rule.id.trim().to_string();
            if rule.id.is_empty() {
                return Err(RuleError::EmptyId(position));
            }
            if rule.id.eq_ignore_ascii_case(DEFAULT_RULE_ID) {
                return Err(RuleError::ReservedId(rule.id));
            }
            if !seen.insert(rule.id.clone()) {
                return Err(RuleError::DuplicateId(rule.id));
            }
            if rule.keywords.is_empty() {
                return Err(RuleError::EmptyKeywords(rule.id));
            }

            let mut keywords: Vec<String> = Vec::with_capacity(rule.keywords.len());
            for keyword in &rule.keywords {
                let keyword = keyword.trim().to_lowercase();
                if keyword.is_empty() {
                    return Err(RuleError::EmptyKeyword(rule.id.clone()));
                }
                if !keywords.contains(&keyword) {
                    keywords.push(keyword);
                }
            }
            rule.keywords = keywords;
            normalized.push(rule);
        }

        // sort_by_key is stable, so equal priorities keep declaration order.
        let mut order: Vec<usize> = (0..normalized.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(normalized[i].priority));

        Ok(Self {
            rules: normalized,
            order,
            default,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let book: RuleBook = serde_json::from_str(json)?;
        Self::new(book.rules, book.default)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, RuleError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let set = Self::from_json(&json)?;
        info!(path = %path.display(), rules = set.len(), "rule file loaded");
        Ok(set)
    }

    /// Chat assistant rule book compiled into the crate.
    pub fn chat() -> Result<Self, RuleError> {
        Self::from_json(CHAT_RULES)
    }

    /// Document insight rule book compiled into the crate.
    pub fn documents() -> Result<Self, RuleError> {
        Self::from_json(DOCUMENT_RULES)
    }

    /// Rules in declaration order.
    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    /// Rules in the order `classify` tests them.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &ClassificationRule> {
        self.order.iter().map(move |&i| &self.rules[i])
    }

    pub fn default_rule(&self) -> &DefaultRule {
        &self.default
    }

    pub fn get(&self, id: &str) -> Option<&ClassificationRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Category, RiskLevel};

    fn rule(id: &str, keywords: &[&str], priority: i32) -> ClassificationRule {
        ClassificationRule {
            id: id.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: Category::General,
            risk_level: RiskLevel::Low,
            responses: vec![],
            priority,
        }
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = RuleSet::new(
            vec![rule("a", &["x"], 0), rule("a", &["y"], 1)],
            DefaultRule::default(),
        )
        .unwrap_err();
        assert!(matches!(err, RuleError::DuplicateId(id) if id == "a"));
    }

    #[test]
    fn test_reserved_and_empty_ids_rejected() {
        let err = RuleSet::new(vec![rule("default", &["x"], 0)], DefaultRule::default())
            .unwrap_err();
        assert!(matches!(err, RuleError::ReservedId(_)));

        let err = RuleSet::new(vec![rule("  ", &["x"], 0)], DefaultRule::default()).unwrap_err();
        assert!(matches!(err, RuleError::EmptyId(0)));
    }

    #[test]
    fn test_empty_keywords_rejected() {
        let err = RuleSet::new(vec![rule("a", &[], 0)], DefaultRule::default()).unwrap_err();
        assert!(matches!(err, RuleError::EmptyKeywords(id) if id == "a"));

        let err = RuleSet::new(vec![rule("b", &["ok", "  "], 0)], DefaultRule::default())
            .unwrap_err();
        assert!(matches!(err, RuleError::EmptyKeyword(id) if id == "b"));
    }

    #[test]
    fn test_keywords_normalized() {
        let set = RuleSet::new(
            vec![rule("a", &[" Fever ", "fever", "CHILLS"], 0)],
            DefaultRule::default(),
        )
        .unwrap();
        assert_eq!(set.rules()[0].keywords, vec!["fever", "chills"]);
    }

    #[test]
    fn test_evaluation_order_is_stable() {
        let set = RuleSet::new(
            vec![
                rule("low", &["a"], 1),
                rule("first-high", &["a"], 5),
                rule("second-high", &["a"], 5),
                rule("negative", &["a"], -3),
            ],
            DefaultRule::default(),
        )
        .unwrap();
        let ids: Vec<&str> = set.evaluation_order().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["first-high", "second-high", "low", "negative"]);
        let declared: Vec<&str> = set.rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(declared, vec!["low", "first-high", "second-high", "negative"]);
    }

    #[test]
    fn test_unknown_enum_value_rejected() {
        let json = r#"{"rules":[{"id":"a","keywords":["x"],"category":"Dental","riskLevel":"Low","responses":[]}]}"#;
        assert!(matches!(RuleSet::from_json(json), Err(RuleError::Parse(_))));

        let json = r#"{"rules":[{"id":"a","keywords":["x"],"category":"General","riskLevel":"Severe","responses":[]}]}"#;
        assert!(matches!(RuleSet::from_json(json), Err(RuleError::Parse(_))));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{"rules":[{"id":"a","keywords":["x"],"category":"General","riskLevel":"Low","responses":[],"weight":2}]}"#;
        assert!(matches!(RuleSet::from_json(json), Err(RuleError::Parse(_))));
    }

    #[test]
    fn test_default_rule_optional() {
        let json = r#"{"rules":[]}"#;
        let set = RuleSet::from_json(json).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.default_rule(), &DefaultRule::default());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = RuleSet::from_path("/nonexistent/rules.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rules.json"));
    }

    #[test]
    fn test_embedded_rule_books_load() {
        let chat = RuleSet::chat().unwrap();
        assert!(chat.get("ame-examination").is_some());
        assert!(chat.get("emergency").is_some());
        assert_eq!(chat.default_rule().category, Category::General);

        let docs = RuleSet::documents().unwrap();
        assert!(docs.get("lab-results").is_some());
        assert!(docs.get("imaging").is_some());
        assert!(docs.get("immunization").is_some());
    }
}
