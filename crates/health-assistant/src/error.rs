use dockyard_common::openai::OpenAiClientError;
use triage_engine::RuleError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Rules(#[from] RuleError),

    #[error("model request failed: {0}")]
    Model(#[from] OpenAiClientError),

    #[error("rate limit exceeded (RATE_LIMIT_RPS={rps}): try again in ~{retry_after_ms}ms")]
    RateLimited { rps: u32, retry_after_ms: u64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
