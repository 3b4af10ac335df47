//! Persona analysis handler.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use vlens_analysis::AnalysisError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const SUCCESS_MESSAGE: &str = "所有视角的分析均已完成";

/// Analyze request body.
///
/// `record_id` is kept loosely typed so a wrong type is reported the same
/// way as a missing field.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub record_id: Option<Value>,
}

impl AnalyzeRequest {
    fn task_id(&self) -> Option<&str> {
        self.record_id
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Analyze response body.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub message: String,
}

/// Run the persona analysis for one task record.
///
/// The body is parsed by hand so that a missing content type or invalid
/// JSON yields the same 400 as a missing `record_id`.
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<AnalyzeResponse>> {
    let request: Option<AnalyzeRequest> = serde_json::from_slice(&body).ok();
    let task_id = request
        .as_ref()
        .and_then(AnalyzeRequest::task_id)
        .ok_or(AnalysisError::MissingTaskId)?;

    info!(task_id = %task_id, "Analysis requested");

    let summary = state.orchestrator.run(task_id).await?;

    info!(
        task_id = %summary.task_id,
        results = summary.result_ids.len(),
        skipped = summary.skipped_personas.len(),
        "Analysis finished"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        message: SUCCESS_MESSAGE.to_string(),
    }))
}

/// Fallback for non-POST methods on the analyze route.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: Value) -> AnalyzeRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_task_id_accepts_non_empty_string() {
        assert_eq!(parse(json!({"record_id": " recT "})).task_id(), Some("recT"));
    }

    #[test]
    fn test_task_id_rejects_missing_empty_and_non_string() {
        assert_eq!(parse(json!({})).task_id(), None);
        assert_eq!(parse(json!({"record_id": ""})).task_id(), None);
        assert_eq!(parse(json!({"record_id": null})).task_id(), None);
        assert_eq!(parse(json!({"record_id": 42})).task_id(), None);
    }
}
