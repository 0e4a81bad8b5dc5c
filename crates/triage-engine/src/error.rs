/// Rule configuration failures. All of them are raised at load time; once a
/// `RuleSet` exists, classification cannot fail.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("failed to read rule file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid rule configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate rule id: {0}")]
    DuplicateId(String),

    #[error("rule id {0} is reserved for the default rule")]
    ReservedId(String),

    #[error("rule at position {0} has an empty id")]
    EmptyId(usize),

    #[error("rule {0} has no keywords")]
    EmptyKeywords(String),

    #[error("rule {0} has a blank keyword")]
    EmptyKeyword(String),
}
