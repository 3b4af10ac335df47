//! Analysis error types.
//!
//! The `Display` text of each variant is what the HTTP caller sees.

use thiserror::Error;

pub type AnalysisResult<T> = Result<T, AnalysisError>;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("请求体中必须包含 record_id")]
    MissingTaskId,

    #[error("未选择任何人物画像进行分析")]
    NoPersonasSelected,

    #[error("未提供视频链接或上传视频文件")]
    NoVideoSource,

    #[error("下载文件失败: {0}")]
    Download(String),

    #[error("AI未能为画像 {persona_id} 返回有效的JSON对象")]
    NoJsonObject { persona_id: String },

    #[error("解析分析结果JSON失败: {0}")]
    MalformedJson(#[source] serde_json::Error),

    #[error("AI分析失败: {0}")]
    Inference(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error(transparent)]
    Store(#[from] vlens_bitable::BitableError),
}

impl AnalysisError {
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for errors caused by the caller's request rather than by
    /// task content or an external service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, AnalysisError::MissingTaskId)
    }
}
