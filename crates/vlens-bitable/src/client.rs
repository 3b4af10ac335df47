//! Bitable REST API client.
//!
//! Thin client over the Lark/Feishu Base open API with:
//! - HTTP client tuning (pooling, timeouts)
//! - Envelope decoding (`code != 0` is an error)
//! - Observability (tracing spans, metrics)
//!
//! Calls are made once; there is no retry layer.

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info_span, Instrument};
use vlens_models::FieldMap;

use crate::error::{BitableError, BitableResult};
use crate::metrics::record_request;
use crate::types::{Envelope, FieldsBody, Record, RecordData, TmpDownloadUrlData};

// =============================================================================
// Configuration
// =============================================================================

const DEFAULT_BASE_URL: &str = "https://base-api.feishu.cn";

/// Bitable client configuration.
#[derive(Debug, Clone)]
pub struct BitableConfig {
    /// API origin, without trailing slash
    pub base_url: String,
    /// Base (app) token the tables live in
    pub app_token: String,
    /// Personal base token used as bearer credential
    pub personal_base_token: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl BitableConfig {
    /// Create config from environment variables.
    pub fn from_env() -> BitableResult<Self> {
        let app_token = required_env("FEISHU_APP_TOKEN")?;
        let personal_base_token = required_env("FEISHU_PERSONAL_BASE_TOKEN")?;

        let timeout_secs: u64 = std::env::var("FEISHU_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        let connect_timeout_secs: u64 = std::env::var("FEISHU_CONNECT_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        Ok(Self {
            base_url: std::env::var("FEISHU_API_BASE_URL")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            app_token,
            personal_base_token,
            timeout: Duration::from_secs(timeout_secs),
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }
}

fn required_env(name: &str) -> BitableResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(BitableError::config(format!("{} 未设置", name))),
    }
}

// =============================================================================
// Client
// =============================================================================

/// Bitable REST API client.
#[derive(Clone)]
pub struct BitableClient {
    http: Client,
    config: BitableConfig,
}

impl BitableClient {
    /// Create a new bitable client.
    pub fn new(config: BitableConfig) -> BitableResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("vlens-bitable/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BitableError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> BitableResult<Self> {
        Self::new(BitableConfig::from_env()?)
    }

    fn records_url(&self, table_id: &str) -> String {
        format!(
            "{}/open-apis/bitable/v1/apps/{}/tables/{}/records",
            self.config.base_url,
            urlencoding::encode(&self.config.app_token),
            urlencoding::encode(table_id)
        )
    }

    fn record_url(&self, table_id: &str, record_id: &str) -> String {
        format!(
            "{}/{}",
            self.records_url(table_id),
            urlencoding::encode(record_id)
        )
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Get a record.
    pub async fn get_record(&self, table_id: &str, record_id: &str) -> BitableResult<Record> {
        let url = self.record_url(table_id, record_id);
        let data: RecordData = self
            .execute("get_record", table_id, Some(record_id), self.http.get(&url))
            .await?;
        Ok(data.record)
    }

    /// Update the given fields of a record. Other fields are left untouched.
    pub async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldMap,
    ) -> BitableResult<Record> {
        let url = self.record_url(table_id, record_id);
        let request = self.http.put(&url).json(&FieldsBody { fields });
        let data: RecordData = self
            .execute("update_record", table_id, Some(record_id), request)
            .await?;
        Ok(data.record)
    }

    /// Create a record.
    pub async fn create_record(&self, table_id: &str, fields: &FieldMap) -> BitableResult<Record> {
        let url = self.records_url(table_id);
        let request = self.http.post(&url).json(&FieldsBody { fields });
        let data: RecordData = self
            .execute("create_record", table_id, None, request)
            .await?;
        Ok(data.record)
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Resolve a short-lived download URL for an attachment's file token.
    pub async fn tmp_download_url(&self, file_token: &str) -> BitableResult<String> {
        let url = format!(
            "{}/open-apis/drive/v1/medias/batch_get_tmp_download_url",
            self.config.base_url
        );
        let request = self.http.get(&url).query(&[("file_tokens", file_token)]);
        let data: TmpDownloadUrlData = self
            .execute("tmp_download_url", "drive", Some(file_token), request)
            .await?;

        let mut urls = data.tmp_download_urls;
        if urls.is_empty() {
            return Err(BitableError::invalid_response(format!(
                "未返回文件 {} 的下载链接",
                file_token
            )));
        }
        let index = urls
            .iter()
            .position(|u| u.file_token == file_token)
            .unwrap_or(0);
        Ok(urls.swap_remove(index).tmp_download_url)
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Send a request with auth, tracing and metrics, and decode the envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        table: &str,
        record_id: Option<&str>,
        request: RequestBuilder,
    ) -> BitableResult<T> {
        let span = if let Some(id) = record_id {
            info_span!("bitable_request", operation = %operation, table = %table, record_id = %id)
        } else {
            info_span!("bitable_request", operation = %operation, table = %table)
        };

        let start = Instant::now();
        let result = self.send(request).instrument(span).await;
        let latency_ms = start.elapsed().as_millis() as f64;

        let status = match &result {
            Ok(_) => 200,
            Err(e) => e.http_status().unwrap_or(500),
        };
        record_request(operation, status, latency_ms);

        result
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> BitableResult<T> {
        let response = request
            .bearer_auth(&self.config.personal_base_token)
            .send()
            .await
            .map_err(|e| BitableError::Network(e.without_url()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BitableError::Network(e.without_url()))?;
        debug!(status = status.as_u16(), bytes = body.len(), "bitable response");

        if !status.is_success() {
            // Error responses usually still carry the envelope
            if let Ok(envelope) = serde_json::from_str::<Envelope<serde_json::Value>>(&body) {
                if envelope.code != 0 {
                    return Err(match status.as_u16() {
                        404 => BitableError::NotFound(envelope.msg),
                        403 => BitableError::PermissionDenied(envelope.msg),
                        429 => BitableError::RateLimited(envelope.msg),
                        _ => BitableError::Api {
                            code: envelope.code,
                            msg: envelope.msg,
                        },
                    });
                }
            }
            return Err(BitableError::from_http_status(status.as_u16(), body));
        }

        let envelope: Envelope<T> = serde_json::from_str(&body)?;
        envelope.into_data()
    }
}
