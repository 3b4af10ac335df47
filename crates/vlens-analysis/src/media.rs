//! HTTP media fetcher.
//!
//! Downloads the whole video into memory. The bytes live only as long as
//! the request that fetched them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::info;

use crate::error::{AnalysisError, AnalysisResult};
use crate::ports::{FetchedMedia, MediaFetcher};

/// [`MediaFetcher`] over plain HTTP GET.
#[derive(Clone)]
pub struct HttpMediaFetcher {
    client: Client,
}

impl HttpMediaFetcher {
    pub fn new(connect_timeout: Duration) -> AnalysisResult<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("vlens-analysis/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnalysisError::config(format!("创建下载客户端失败: {}", e)))?;
        Ok(Self { client })
    }

    /// Create from environment variables (`MEDIA_CONNECT_TIMEOUT_SECS`, default 10).
    pub fn from_env() -> AnalysisResult<Self> {
        let connect_timeout_secs: u64 = std::env::var("MEDIA_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10);
        Self::new(Duration::from_secs(connect_timeout_secs))
    }
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> AnalysisResult<FetchedMedia> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AnalysisError::download(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.as_str().to_string());
            return Err(AnalysisError::download(reason));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AnalysisError::download(e.without_url().to_string()))?;

        info!(
            bytes = bytes.len(),
            content_type = content_type.as_deref().unwrap_or("-"),
            "Downloaded video"
        );

        Ok(FetchedMedia {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
