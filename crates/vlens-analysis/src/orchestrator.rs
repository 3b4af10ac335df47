//! Persona analysis orchestrator.
//!
//! One call to [`AnalysisOrchestrator::run`] handles one task record:
//!
//! 1. Mark the task in progress
//! 2. Load the task and check it names personas and a video
//! 3. Resolve the video (attachment first, URL otherwise) and encode it
//! 4. For each persona, in order: prompt the model, extract its JSON
//!    object and write one result record
//! 5. Mark the task completed
//!
//! Any error from step 1 onward aborts the run. The task is then marked
//! failed on a best-effort basis and the aborting error is returned.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::Instrument;
use vlens_models::{
    AnalysisOutput, PersonaRecord, ResultRecord, TaskRecord, TaskStatus, VideoSource,
};

use crate::config::TableIds;
use crate::error::{AnalysisError, AnalysisResult};
use crate::extract::extract_json_object;
use crate::logging::TaskLogger;
use crate::metrics::{record_persona, record_run};
use crate::ports::{InferenceEngine, InlineMedia, MediaFetcher, RecordStore};
use crate::prompt::build_persona_prompt;

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisSummary {
    pub task_id: String,
    /// Ids of the result records created, in persona order
    pub result_ids: Vec<String>,
    /// Personas skipped for having no description
    pub skipped_personas: Vec<String>,
}

/// Drives a task through the analysis workflow.
///
/// Holds its collaborators behind `Arc`s so one instance can serve every
/// request of the process.
#[derive(Clone)]
pub struct AnalysisOrchestrator {
    store: Arc<dyn RecordStore>,
    inference: Arc<dyn InferenceEngine>,
    fetcher: Arc<dyn MediaFetcher>,
    tables: TableIds,
}

impl AnalysisOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        inference: Arc<dyn InferenceEngine>,
        fetcher: Arc<dyn MediaFetcher>,
        tables: TableIds,
    ) -> Self {
        Self {
            store,
            inference,
            fetcher,
            tables,
        }
    }

    /// Run the full workflow for one task record.
    pub async fn run(&self, task_id: &str) -> AnalysisResult<AnalysisSummary> {
        let task_id = task_id.trim();
        if task_id.is_empty() {
            return Err(AnalysisError::MissingTaskId);
        }

        let logger = TaskLogger::new(task_id, "persona_analysis");
        let span = logger.create_span();
        let start = Instant::now();

        async {
            logger.log_start("analysis requested");

            match self.analyze(task_id, &logger).await {
                Ok(summary) => {
                    record_run("completed", start.elapsed().as_secs_f64());
                    logger.log_completion(&format!(
                        "{} result(s) written, {} persona(s) skipped",
                        summary.result_ids.len(),
                        summary.skipped_personas.len()
                    ));
                    Ok(summary)
                }
                Err(e) => {
                    record_run("failed", start.elapsed().as_secs_f64());
                    logger.log_error(&e.to_string());
                    self.mark_failed(task_id, &logger).await;
                    Err(e)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn analyze(&self, task_id: &str, logger: &TaskLogger) -> AnalysisResult<AnalysisSummary> {
        self.set_status(task_id, TaskStatus::InProgress).await?;

        let record = self.store.get_record(&self.tables.tasks, task_id).await?;
        let task = TaskRecord::from_fields(task_id, &record.fields);

        if task.persona_ids.is_empty() {
            return Err(AnalysisError::NoPersonasSelected);
        }
        let source = task.video_source().ok_or(AnalysisError::NoVideoSource)?;

        let media = self.resolve_video(&source, logger).await?;
        logger.log_progress(&format!(
            "video ready ({}, {} base64 chars), {} persona(s) selected",
            media.mime_type,
            media.data.len(),
            task.persona_ids.len()
        ));

        let mut summary = AnalysisSummary {
            task_id: task_id.to_string(),
            result_ids: Vec::with_capacity(task.persona_ids.len()),
            skipped_personas: Vec::new(),
        };

        for persona_id in &task.persona_ids {
            match self.analyze_persona(task_id, persona_id, &media, logger).await? {
                Some(result_id) => {
                    record_persona("analyzed");
                    summary.result_ids.push(result_id);
                }
                None => {
                    record_persona("skipped");
                    summary.skipped_personas.push(persona_id.clone());
                }
            }
        }

        self.set_status(task_id, TaskStatus::Completed).await?;
        Ok(summary)
    }

    /// Fetch the video bytes for `source` and encode them for the model.
    async fn resolve_video(
        &self,
        source: &VideoSource,
        logger: &TaskLogger,
    ) -> AnalysisResult<InlineMedia> {
        let url = match source {
            VideoSource::Attachment { file_token } => {
                logger.log_progress("resolving attachment download url");
                self.store.resolve_download_url(file_token).await?
            }
            VideoSource::Url { url } => url.clone(),
        };

        let fetched = self.fetcher.fetch(&url).await?;
        Ok(InlineMedia::from(fetched))
    }

    /// Analyze one persona. Returns the created result id, or `None` when
    /// the persona has no description and was skipped.
    async fn analyze_persona(
        &self,
        task_id: &str,
        persona_id: &str,
        media: &InlineMedia,
        logger: &TaskLogger,
    ) -> AnalysisResult<Option<String>> {
        let record = self
            .store
            .get_record(&self.tables.personas, persona_id)
            .await?;
        let persona = PersonaRecord::from_fields(persona_id, &record.fields);

        let Some(description) = persona.description else {
            logger.log_warning(&format!("persona {} has no description, skipped", persona_id));
            return Ok(None);
        };

        let prompt = build_persona_prompt(&description);
        let text = self.inference.generate(&prompt, media).await?;

        let json = extract_json_object(&text).ok_or_else(|| AnalysisError::NoJsonObject {
            persona_id: persona_id.to_string(),
        })?;
        let output: AnalysisOutput =
            serde_json::from_str(json).map_err(AnalysisError::MalformedJson)?;

        let result = ResultRecord::new(task_id, persona_id, output);
        let result_id = self
            .store
            .create_record(&self.tables.results, &result.to_fields())
            .await?;

        logger.log_progress(&format!("persona {} analyzed -> {}", persona_id, result_id));
        Ok(Some(result_id))
    }

    async fn set_status(&self, task_id: &str, status: TaskStatus) -> AnalysisResult<()> {
        self.store
            .update_record(&self.tables.tasks, task_id, &TaskRecord::status_fields(status))
            .await
    }

    /// Record the failure on the task. Errors here are logged and dropped
    /// so the caller still sees the error that aborted the run.
    async fn mark_failed(&self, task_id: &str, logger: &TaskLogger) {
        if let Err(e) = self.set_status(task_id, TaskStatus::Failed).await {
            logger.log_error(&format!("could not set failed status: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryRecordStore, ScriptedInference, StaticMediaFetcher, StoreCall};
    use serde_json::json;
    use vlens_models::FieldMap;

    const TASKS: &str = "tblTasks";
    const PERSONAS: &str = "tblPersonas";
    const RESULTS: &str = "tblResults";
    const VIDEO_URL: &str = "https://cdn.test/video.mp4";

    const GOOD_REPLY: &str = "```json\n{\"timestamp_analysis\": \"00:03 - 兴趣激增：开场\", \"overall_summary\": \"节奏不错\"}\n```";

    struct Harness {
        store: Arc<InMemoryRecordStore>,
        inference: Arc<ScriptedInference>,
        fetcher: Arc<StaticMediaFetcher>,
        orchestrator: AnalysisOrchestrator,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryRecordStore::new());
        let inference = Arc::new(ScriptedInference::new());
        let fetcher = Arc::new(StaticMediaFetcher::new());
        let orchestrator = AnalysisOrchestrator::new(
            store.clone(),
            inference.clone(),
            fetcher.clone(),
            TableIds {
                tasks: TASKS.into(),
                personas: PERSONAS.into(),
                results: RESULTS.into(),
            },
        );
        Harness {
            store,
            inference,
            fetcher,
            orchestrator,
        }
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        value.as_object().cloned().unwrap()
    }

    fn url_task(personas: &[&str]) -> FieldMap {
        let links: Vec<_> = personas.iter().map(|id| json!({"record_id": id})).collect();
        fields(json!({
            "分析状态": "未开始",
            "视频链接": VIDEO_URL,
            "分析视角 (多选)": links
        }))
    }

    fn persona(description: &str) -> FieldMap {
        fields(json!({ "AI提示词描述": description }))
    }

    #[tokio::test]
    async fn test_successful_run_transitions_and_results() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1", "recP2"]));
        h.store.insert(PERSONAS, "recP1", persona("学生党"));
        h.store.insert(PERSONAS, "recP2", persona("宝妈"));
        h.fetcher.serve(VIDEO_URL, b"mp4bytes", None);
        h.inference.reply(GOOD_REPLY).reply(GOOD_REPLY);

        let summary = h.orchestrator.run("recT").await.unwrap();

        assert_eq!(summary.result_ids.len(), 2);
        assert!(summary.skipped_personas.is_empty());
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "已完成"]);

        let results = h.store.records(RESULTS);
        assert_eq!(results.len(), 2);
        let (_, first) = &results[0];
        assert_eq!(first.get("关联任务"), Some(&json!([{"record_id": "recT"}])));
        assert_eq!(first.get("分析视角"), Some(&json!([{"record_id": "recP1"}])));
        assert_eq!(first.get("综合评价与建议"), Some(&json!("节奏不错")));

        let requests = h.inference.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].0.contains("学生党"));
        assert!(requests[1].0.contains("宝妈"));
        assert_eq!(requests[0].1.mime_type, "video/mp4");
        assert_eq!(requests[0].1.data, "bXA0Ynl0ZXM=");
    }

    #[tokio::test]
    async fn test_blank_task_id_makes_no_calls() {
        let h = harness();
        let err = h.orchestrator.run("  ").await.unwrap_err();
        assert!(matches!(err, AnalysisError::MissingTaskId));
        assert!(h.store.calls().is_empty());
        assert!(h.fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_no_personas_marks_failed_without_results() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&[]));

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert!(matches!(err, AnalysisError::NoPersonasSelected));
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
        assert!(h.store.records(RESULTS).is_empty());
        assert!(h.fetcher.fetched().is_empty());
    }

    #[tokio::test]
    async fn test_no_video_source_fails_after_in_progress() {
        let h = harness();
        h.store.insert(
            TASKS,
            "recT",
            fields(json!({"分析视角 (多选)": [{"record_id": "recP1"}]})),
        );

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert!(matches!(err, AnalysisError::NoVideoSource));
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
    }

    #[tokio::test]
    async fn test_attachment_resolves_download_url_before_fetch() {
        let h = harness();
        h.store.insert(
            TASKS,
            "recT",
            fields(json!({
                "上传视频": [{"file_token": "boxTok", "name": "v.mov"}],
                "视频链接": "https://ignored.test/v.mp4",
                "分析视角 (多选)": [{"record_id": "recP1"}]
            })),
        );
        h.store.insert(PERSONAS, "recP1", persona("游戏玩家"));
        h.store.set_download_url("boxTok", "https://dl.test/tmp/boxTok");
        h.fetcher
            .serve("https://dl.test/tmp/boxTok", b"mov", Some("video/quicktime"));
        h.inference.reply(GOOD_REPLY);

        h.orchestrator.run("recT").await.unwrap();

        let calls = h.store.calls();
        let resolve_at = calls
            .iter()
            .position(|c| matches!(c, StoreCall::ResolveDownloadUrl { file_token } if file_token == "boxTok"))
            .expect("download url resolved");
        let persona_get_at = calls
            .iter()
            .position(|c| matches!(c, StoreCall::Get { table, .. } if table == PERSONAS))
            .unwrap();
        assert!(resolve_at < persona_get_at);
        assert_eq!(h.fetcher.fetched(), vec!["https://dl.test/tmp/boxTok"]);
        assert_eq!(h.inference.requests()[0].1.mime_type, "video/quicktime");
    }

    #[tokio::test]
    async fn test_url_source_fetched_directly() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1"]));
        h.store.insert(PERSONAS, "recP1", persona("p"));
        h.fetcher.serve(VIDEO_URL, b"v", Some("video/webm"));
        h.inference.reply(GOOD_REPLY);

        h.orchestrator.run("recT").await.unwrap();

        assert!(!h
            .store
            .calls()
            .iter()
            .any(|c| matches!(c, StoreCall::ResolveDownloadUrl { .. })));
        assert_eq!(h.fetcher.fetched(), vec![VIDEO_URL]);
    }

    #[tokio::test]
    async fn test_persona_without_description_is_skipped() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1", "recP2", "recP3"]));
        h.store.insert(PERSONAS, "recP1", persona("职场新人"));
        h.store.insert(PERSONAS, "recP2", persona(""));
        h.store.insert(PERSONAS, "recP3", persona("退休教师"));
        h.fetcher.serve(VIDEO_URL, b"v", None);
        h.inference.reply(GOOD_REPLY).reply(GOOD_REPLY);

        let summary = h.orchestrator.run("recT").await.unwrap();

        assert_eq!(summary.result_ids.len(), 2);
        assert_eq!(summary.skipped_personas, vec!["recP2"]);
        assert_eq!(h.inference.requests().len(), 2);

        let personas: Vec<_> = h
            .store
            .records(RESULTS)
            .into_iter()
            .map(|(_, f)| f.get("分析视角").cloned().unwrap())
            .collect();
        assert_eq!(
            personas,
            vec![json!([{"record_id": "recP1"}]), json!([{"record_id": "recP3"}])]
        );
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "已完成"]);
    }

    #[tokio::test]
    async fn test_reply_without_json_aborts_and_names_persona() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1", "recP2"]));
        h.store.insert(PERSONAS, "recP1", persona("a"));
        h.store.insert(PERSONAS, "recP2", persona("b"));
        h.fetcher.serve(VIDEO_URL, b"v", None);
        h.inference.reply("Sorry, I can't help with that.");

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert!(matches!(err, AnalysisError::NoJsonObject { .. }));
        assert!(err.to_string().contains("recP1"));
        assert_eq!(h.inference.requests().len(), 1);
        assert!(h.store.records(RESULTS).is_empty());
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
    }

    #[tokio::test]
    async fn test_malformed_json_is_fatal_after_earlier_results() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1", "recP2"]));
        h.store.insert(PERSONAS, "recP1", persona("a"));
        h.store.insert(PERSONAS, "recP2", persona("b"));
        h.fetcher.serve(VIDEO_URL, b"v", None);
        h.inference
            .reply(GOOD_REPLY)
            .reply("{\"timestamp_analysis\": \"00:01\", }");

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert!(matches!(err, AnalysisError::MalformedJson(_)));
        assert_eq!(h.store.records(RESULTS).len(), 1);
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
    }

    #[tokio::test]
    async fn test_download_failure_message() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1"]));
        h.fetcher.fail(VIDEO_URL, "Forbidden");

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert_eq!(err.to_string(), "下载文件失败: Forbidden");
        assert!(h.inference.requests().is_empty());
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
    }

    #[tokio::test]
    async fn test_failed_status_write_does_not_mask_error() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1"]));
        h.store.insert(PERSONAS, "recP1", persona("a"));
        h.fetcher.serve(VIDEO_URL, b"v", None);
        h.inference.fail("Gemini API 返回 500 Internal Server Error: boom");
        h.store.fail_status_update(TaskStatus::Failed);

        let err = h.orchestrator.run("recT").await.unwrap_err();

        assert!(matches!(err, AnalysisError::Inference(_)));
        assert!(err.to_string().contains("boom"));
        assert_eq!(h.store.status_history(TASKS, "recT"), vec!["分析中", "失败"]);
        assert_eq!(
            h.store.record(TASKS, "recT").unwrap().get("分析状态"),
            Some(&json!("分析中"))
        );
    }

    #[tokio::test]
    async fn test_missing_task_record_still_attempts_failed_status() {
        let h = harness();

        let err = h.orchestrator.run("recGhost").await.unwrap_err();

        assert!(matches!(err, AnalysisError::Store(_)));
        assert_eq!(
            h.store.status_history(TASKS, "recGhost"),
            vec!["分析中", "失败"]
        );
    }

    #[tokio::test]
    async fn test_rerun_creates_duplicate_results() {
        let h = harness();
        h.store.insert(TASKS, "recT", url_task(&["recP1"]));
        h.store.insert(PERSONAS, "recP1", persona("a"));
        h.fetcher.serve(VIDEO_URL, b"v", None);
        h.inference.reply(GOOD_REPLY).reply(GOOD_REPLY);

        h.orchestrator.run("recT").await.unwrap();
        h.orchestrator.run("recT").await.unwrap();

        assert_eq!(h.store.records(RESULTS).len(), 2);
    }
}
