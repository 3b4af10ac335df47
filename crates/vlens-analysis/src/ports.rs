//! Ports to the external services the orchestrator depends on.
//!
//! Implementations are built once at process start and shared behind
//! `Arc`s; every method is a single call with no retry.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use vlens_bitable::Record;
use vlens_models::FieldMap;

use crate::error::AnalysisResult;

/// MIME type used when a transfer response carries no content type.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";

/// Record CRUD plus attachment URL resolution.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_record(&self, table_id: &str, record_id: &str) -> AnalysisResult<Record>;

    async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldMap,
    ) -> AnalysisResult<()>;

    /// Create a record and return its id.
    async fn create_record(&self, table_id: &str, fields: &FieldMap) -> AnalysisResult<String>;

    /// Resolve a transient download URL from an attachment's storage token.
    async fn resolve_download_url(&self, file_token: &str) -> AnalysisResult<String>;
}

/// Generative model taking a prompt plus one inline media part.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Return the model's free-form text response.
    async fn generate(&self, prompt: &str, media: &InlineMedia) -> AnalysisResult<String>;
}

/// Plain file transfer.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    /// Fetch `url`; non-success transfers fail with the status reason.
    async fn fetch(&self, url: &str) -> AnalysisResult<FetchedMedia>;
}

/// Bytes of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedMedia {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Base64 payload with its MIME type, ready to inline in a model request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    pub data: String,
}

impl From<FetchedMedia> for InlineMedia {
    fn from(media: FetchedMedia) -> Self {
        let mime_type = media
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_VIDEO_MIME.to_string());
        Self {
            mime_type,
            data: STANDARD.encode(&media.bytes),
        }
    }
}
