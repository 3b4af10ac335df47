//! Router tests for the analyze endpoint, backed by in-memory adapters.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vlens_analysis::memory::{InMemoryRecordStore, ScriptedInference, StaticMediaFetcher};
use vlens_analysis::{AnalysisOrchestrator, TableIds};
use vlens_api::{create_router, ApiConfig, AppState};
use vlens_models::FieldMap;

const VIDEO_URL: &str = "https://cdn.test/clip.mp4";

struct TestApp {
    router: Router,
    store: Arc<InMemoryRecordStore>,
    inference: Arc<ScriptedInference>,
    fetcher: Arc<StaticMediaFetcher>,
}

fn test_app() -> TestApp {
    let store = Arc::new(InMemoryRecordStore::new());
    let inference = Arc::new(ScriptedInference::new());
    let fetcher = Arc::new(StaticMediaFetcher::new());

    let orchestrator = AnalysisOrchestrator::new(
        store.clone(),
        inference.clone(),
        fetcher.clone(),
        TableIds {
            tasks: "tblTasks".into(),
            personas: "tblPersonas".into(),
            results: "tblResults".into(),
        },
    );
    let state = AppState::new(ApiConfig::default(), orchestrator);

    TestApp {
        router: create_router(state, None),
        store,
        inference,
        fetcher,
    }
}

fn fields(value: Value) -> FieldMap {
    value.as_object().cloned().unwrap()
}

fn post_analyze(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_successful_analysis() {
    let app = test_app();
    app.store.insert(
        "tblTasks",
        "recT",
        fields(json!({
            "视频链接": {"link": VIDEO_URL, "text": "clip"},
            "分析视角 (多选)": [{"record_ids": ["recP1"]}]
        })),
    );
    app.store
        .insert("tblPersonas", "recP1", fields(json!({"AI提示词描述": "大学生"})));
    app.fetcher.serve(VIDEO_URL, b"bytes", Some("video/mp4"));
    app.inference
        .reply(r#"{"timestamp_analysis": ["00:01 - 兴趣激增", "00:09 - 兴趣下降"], "overall_summary": "ok"}"#);

    let response = app.router.oneshot(post_analyze(r#"{"record_id":"recT"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["message"], json!("所有视角的分析均已完成"));

    let results = app.store.records("tblResults");
    assert_eq!(results.len(), 1);
    assert_eq!(
        results[0].1.get("时间点分析"),
        Some(&json!("00:01 - 兴趣激增\n00:09 - 兴趣下降"))
    );
    assert_eq!(app.store.status_history("tblTasks", "recT"), vec!["分析中", "已完成"]);
}

#[tokio::test]
async fn test_missing_record_id_is_bad_request_without_side_effects() {
    for body in [r#"{}"#, r#"{"record_id":""}"#, r#"{"record_id":7}"#, "not json", ""] {
        let app = test_app();

        let response = app.router.oneshot(post_analyze(body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);
        let json = json_body(response).await;
        assert_eq!(json["error"], json!("请求体中必须包含 record_id"));
        assert!(app.store.calls().is_empty());
    }
}

#[tokio::test]
async fn test_wrong_method_is_not_allowed() {
    let app = test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/analyze")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("Method Not Allowed"));
    assert!(app.store.calls().is_empty());
}

#[tokio::test]
async fn test_processing_failure_returns_message_verbatim() {
    let app = test_app();
    app.store.insert(
        "tblTasks",
        "recT",
        fields(json!({"视频链接": VIDEO_URL, "分析视角 (多选)": []})),
    );

    let response = app.router.oneshot(post_analyze(r#"{"record_id":"recT"}"#)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert_eq!(body["error"], json!("未选择任何人物画像进行分析"));
    assert_eq!(app.store.status_history("tblTasks", "recT"), vec!["分析中", "失败"]);
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = test_app();

    let response = app
        .router
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");
    let body = json_body(response).await;
    assert_eq!(body["status"], json!("healthy"));
}

#[tokio::test]
async fn test_welcome_page() {
    let app = test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("后端服务正在正常运行"));
}

#[tokio::test]
async fn test_metrics_route_absent_when_disabled() {
    let app = test_app();

    let response = app
        .router
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
