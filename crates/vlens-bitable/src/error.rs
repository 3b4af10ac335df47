//! Bitable error types.

use thiserror::Error;

/// Result type for bitable operations.
pub type BitableResult<T> = Result<T, BitableError>;

/// Errors that can occur during bitable operations.
#[derive(Debug, Error)]
pub enum BitableError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("记录不存在: {0}")]
    NotFound(String),

    #[error("无权访问: {0}")]
    PermissionDenied(String),

    #[error("请求过于频繁: {0}")]
    RateLimited(String),

    #[error("多维表格接口错误 {code}: {msg}")]
    Api { code: i64, msg: String },

    #[error("多维表格请求失败 HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("响应格式无效: {0}")]
    InvalidResponse(String),

    #[error("网络错误: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON解析错误: {0}")]
    Json(#[from] serde_json::Error),
}

impl BitableError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Map a non-success HTTP status to an error.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Self::PermissionDenied(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimited(body),
            _ => Self::Http { status, body },
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            BitableError::NotFound(_) => Some(404),
            BitableError::PermissionDenied(_) => Some(403),
            BitableError::RateLimited(_) => Some(429),
            BitableError::Http { status, .. } => Some(*status),
            BitableError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
