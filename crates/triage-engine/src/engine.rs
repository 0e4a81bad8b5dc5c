/// First-match keyword classifier.
///
/// Input is trimmed and lowercased, then rules are tested in descending
/// priority (ties in declaration order). The first rule with any keyword
/// contained in the input wins; nothing is scored. Matching is plain
/// substring search, so `"ame"` also matches inside `"became"`.
///
/// `classify_all` is the multi-section variant used for documents: every
/// matching rule contributes, in evaluation order.
use tracing::debug;

use crate::model::{ClassificationRequest, ClassificationResult, ClassificationRule};
use crate::rules::RuleSet;

/// Classify a request against a rule set. Total over all inputs.
pub fn classify(request: &ClassificationRequest, rules: &RuleSet) -> ClassificationResult {
    classify_text(&request.text, rules)
}

pub fn classify_text(text: &str, rules: &RuleSet) -> ClassificationResult {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return ClassificationResult::from(rules.default_rule());
    }

    for rule in rules.evaluation_order() {
        if let Some(keyword) = matched_keyword(rule, &normalized) {
            debug!(rule = %rule.id, keyword = %keyword, priority = rule.priority, "rule matched");
            return ClassificationResult::from(rule);
        }
    }

    debug!("no rule matched, using default");
    ClassificationResult::from(rules.default_rule())
}

/// Every matching rule in evaluation order, or the default alone when none match.
pub fn classify_all(text: &str, rules: &RuleSet) -> Vec<ClassificationResult> {
    let normalized = normalize(text);
    let matches: Vec<ClassificationResult> = if normalized.is_empty() {
        Vec::new()
    } else {
        rules
            .evaluation_order()
            .filter(|rule| matched_keyword(rule, &normalized).is_some())
            .map(ClassificationResult::from)
            .collect()
    };

    if matches.is_empty() {
        debug!("no rule matched, using default");
        return vec![ClassificationResult::from(rules.default_rule())];
    }
    debug!(matches = matches.len(), "rules matched");
    matches
}

/// Classify each text independently, preserving input order.
pub fn classify_batch<S: AsRef<str>>(texts: &[S], rules: &RuleSet) -> Vec<ClassificationResult> {
    texts
        .iter()
        .map(|t| classify_text(t.as_ref(), rules))
        .collect()
}

fn matched_keyword<'a>(rule: &'a ClassificationRule, normalized: &str) -> Option<&'a String> {
    rule.keywords.iter().find(|k| normalized.contains(k.as_str()))
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
