pub mod engine;
pub mod error;
pub mod model;
pub mod rules;

pub use engine::{classify, classify_all, classify_batch, classify_text};
pub use error::RuleError;
pub use model::{
    Category, ClassificationRequest, ClassificationResult, ClassificationRule, DefaultRule,
    RiskLevel, DEFAULT_RULE_ID,
};
pub use rules::RuleSet;
