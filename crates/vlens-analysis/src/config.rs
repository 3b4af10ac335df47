//! Analysis configuration.

use std::time::Duration;

use crate::error::{AnalysisError, AnalysisResult};

/// Default model when `GEMINI_MODEL_IDENTIFIER` is unset.
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro";

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Identifiers of the three tables the orchestrator works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableIds {
    pub tasks: String,
    pub personas: String,
    pub results: String,
}

/// Orchestrator configuration.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub tables: TableIds,
}

impl AnalysisConfig {
    /// Create config from environment variables.
    pub fn from_env() -> AnalysisResult<Self> {
        Ok(Self {
            tables: TableIds {
                tasks: required_env("TABLE_ID_TASKS")?,
                personas: required_env("TABLE_ID_PERSONAS")?,
                results: required_env("TABLE_ID_RESULTS")?,
            },
        })
    }
}

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    /// Model identifier, e.g. `gemini-2.5-pro`
    pub model: String,
    /// API origin, without trailing slash
    pub base_url: String,
    /// Whole-request timeout; `None` waits as long as the model takes
    pub timeout: Option<Duration>,
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> AnalysisResult<Self> {
        Ok(Self {
            api_key: required_env("GEMINI_API_KEY")?,
            model: std::env::var("GEMINI_MODEL_IDENTIFIER")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: std::env::var("GEMINI_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: std::env::var("GEMINI_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        })
    }
}

fn required_env(name: &str) -> AnalysisResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AnalysisError::config(format!("{} 未设置", name))),
    }
}
