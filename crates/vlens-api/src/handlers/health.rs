//! Health check and welcome handlers.

use axum::response::Html;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// Landing page for people opening the service URL in a browser.
pub async fn welcome() -> Html<&'static str> {
    Html("<h1>后端服务正在正常运行！</h1><p>请在您的飞书插件中进行操作。</p>")
}
