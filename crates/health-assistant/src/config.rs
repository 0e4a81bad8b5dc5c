use std::path::PathBuf;

use tracing::info;
use triage_engine::RuleSet;

use crate::error::AppError;

const DEFAULT_PREDICTION_MODEL: &str = "gpt-4o-mini";

/// Service configuration loaded from environment variables.
///
/// All variables are optional; blank values count as unset.
/// - `RULES_PATH`: chat rule book JSON (embedded book when absent)
/// - `DOCUMENT_RULES_PATH`: document rule book JSON (embedded book when absent)
/// - `PREDICTION_MODEL`: model id for health predictions (default "gpt-4o-mini")
/// - `HTTP_LISTEN_ADDR`: serve the HTTP JSON API on this address
/// - `MCP_TCP_LISTEN_ADDR`: serve MCP on TCP instead of stdio
/// - `RATE_LIMIT_RPS`: model calls per second, disabled when unset or 0
///
/// The `OPENAI_*` variables are read by `OpenAiClientConfig::from_env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub rules_path: Option<PathBuf>,
    pub document_rules_path: Option<PathBuf>,
    pub prediction_model: String,
    pub http_listen_addr: Option<String>,
    pub mcp_tcp_listen_addr: Option<String>,
    pub rate_limit_rps: Option<u32>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let rules_path = get("RULES_PATH").map(PathBuf::from);
        let document_rules_path = get("DOCUMENT_RULES_PATH").map(PathBuf::from);
        for (var, path) in [
            ("RULES_PATH", &rules_path),
            ("DOCUMENT_RULES_PATH", &document_rules_path),
        ] {
            if let Some(path) = path {
                if !path.is_file() {
                    return Err(AppError::Config(format!(
                        "{var} points to a missing file: {}",
                        path.display()
                    )));
                }
            }
        }

        let rate_limit_rps = match get("RATE_LIMIT_RPS") {
            Some(raw) => {
                let rps = raw.parse::<u32>().map_err(|_| {
                    AppError::Config(format!("RATE_LIMIT_RPS must be an integer, got {raw:?}"))
                })?;
                Some(rps).filter(|&n| n > 0)
            }
            None => None,
        };

        Ok(Self {
            rules_path,
            document_rules_path,
            prediction_model: get("PREDICTION_MODEL")
                .unwrap_or_else(|| DEFAULT_PREDICTION_MODEL.to_string()),
            http_listen_addr: get("HTTP_LISTEN_ADDR"),
            mcp_tcp_listen_addr: get("MCP_TCP_LISTEN_ADDR"),
            rate_limit_rps,
        })
    }

    /// Load and validate the chat rule book.
    pub fn load_chat_rules(&self) -> Result<RuleSet, AppError> {
        let rules = match &self.rules_path {
            Some(path) => RuleSet::from_path(path)?,
            None => {
                info!("using embedded chat rules");
                RuleSet::chat()?
            }
        };
        Ok(rules)
    }

    /// Load and validate the document rule book.
    pub fn load_document_rules(&self) -> Result<RuleSet, AppError> {
        let rules = match &self.document_rules_path {
            Some(path) => RuleSet::from_path(path)?,
            None => {
                info!("using embedded document rules");
                RuleSet::documents()?
            }
        };
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_from(&[]).unwrap();
        assert!(config.rules_path.is_none());
        assert!(config.document_rules_path.is_none());
        assert_eq!(config.prediction_model, "gpt-4o-mini");
        assert!(config.http_listen_addr.is_none());
        assert!(config.mcp_tcp_listen_addr.is_none());
        assert!(config.rate_limit_rps.is_none());
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("PREDICTION_MODEL", "  "), ("HTTP_LISTEN_ADDR", "")]).unwrap();
        assert_eq!(config.prediction_model, "gpt-4o-mini");
        assert!(config.http_listen_addr.is_none());
    }

    #[test]
    fn missing_rules_file_is_config_error() {
        let err = config_from(&[("RULES_PATH", "/nonexistent/chat.json")]).unwrap_err();
        assert!(matches!(err, AppError::Config(msg) if msg.contains("RULES_PATH")));
    }

    #[test]
    fn rate_limit_parsing() {
        assert_eq!(
            config_from(&[("RATE_LIMIT_RPS", "5")]).unwrap().rate_limit_rps,
            Some(5)
        );
        assert_eq!(
            config_from(&[("RATE_LIMIT_RPS", "0")]).unwrap().rate_limit_rps,
            None
        );
        assert!(config_from(&[("RATE_LIMIT_RPS", "fast")]).is_err());
    }

    #[test]
    fn embedded_rules_used_by_default() {
        let config = config_from(&[]).unwrap();
        assert!(config.load_chat_rules().unwrap().get("appointment").is_some());
        assert!(config.load_document_rules().unwrap().get("imaging").is_some());
    }

    #[test]
    fn rules_loaded_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rules":[{{"id":"only","keywords":["x"],"category":"General","riskLevel":"Low","responses":[]}}]}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = config_from(&[("RULES_PATH", path.as_str())]).unwrap();
        let rules = config.load_chat_rules().unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.get("only").is_some());
    }

    #[test]
    fn invalid_rules_file_fails_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rules":[{{"id":"a","keywords":["x"],"category":"General","riskLevel":"Low","responses":[]}},{{"id":"a","keywords":["y"],"category":"General","riskLevel":"Low","responses":[]}}]}}"#
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let config = config_from(&[("DOCUMENT_RULES_PATH", path.as_str())]).unwrap();
        assert!(matches!(
            config.load_document_rules(),
            Err(AppError::Rules(triage_engine::RuleError::DuplicateId(_)))
        ));
    }
}
