//! Application state.

use std::sync::Arc;

use vlens_analysis::{
    AnalysisConfig, AnalysisOrchestrator, GeminiClient, HttpMediaFetcher,
};
use vlens_bitable::BitableClient;

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub orchestrator: Arc<AnalysisOrchestrator>,
}

impl AppState {
    /// Wrap an already built orchestrator.
    pub fn new(config: ApiConfig, orchestrator: AnalysisOrchestrator) -> Self {
        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }

    /// Build the production clients from the environment.
    pub fn from_env(config: ApiConfig) -> anyhow::Result<Self> {
        let analysis = AnalysisConfig::from_env()?;
        let bitable = BitableClient::from_env()?;
        let gemini = GeminiClient::from_env()?;
        let fetcher = HttpMediaFetcher::from_env()?;

        let orchestrator = AnalysisOrchestrator::new(
            Arc::new(bitable),
            Arc::new(gemini),
            Arc::new(fetcher),
            analysis.tables,
        );

        Ok(Self::new(config, orchestrator))
    }
}
