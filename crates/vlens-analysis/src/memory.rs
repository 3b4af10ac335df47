//! In-memory adapters for the orchestrator ports.
//!
//! These keep every call in a journal so callers can assert on the exact
//! sequence of external effects a run produced.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use vlens_bitable::{BitableError, Record};
use vlens_models::fields::task as task_fields;
use vlens_models::{FieldMap, TaskStatus};

use crate::error::{AnalysisError, AnalysisResult};
use crate::ports::{FetchedMedia, InferenceEngine, InlineMedia, MediaFetcher, RecordStore};

// =============================================================================
// Record store
// =============================================================================

/// One call made against an [`InMemoryRecordStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Get { table: String, record_id: String },
    Update { table: String, record_id: String, fields: FieldMap },
    Create { table: String, fields: FieldMap },
    ResolveDownloadUrl { file_token: String },
}

#[derive(Default)]
struct StoreState {
    tables: HashMap<String, HashMap<String, FieldMap>>,
    download_urls: HashMap<String, String>,
    failing_statuses: HashSet<&'static str>,
    calls: Vec<StoreCall>,
    next_id: u64,
}

/// Table store kept in process memory.
#[derive(Default)]
pub struct InMemoryRecordStore {
    state: Mutex<StoreState>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record.
    pub fn insert(&self, table: &str, record_id: &str, fields: FieldMap) {
        let mut state = self.lock();
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .insert(record_id.to_string(), fields);
    }

    /// Register the download URL returned for an attachment token.
    pub fn set_download_url(&self, file_token: &str, url: &str) {
        self.lock()
            .download_urls
            .insert(file_token.to_string(), url.to_string());
    }

    /// Make every update that writes `status` fail.
    pub fn fail_status_update(&self, status: TaskStatus) {
        self.lock().failing_statuses.insert(status.label());
    }

    /// Current fields of a record.
    pub fn record(&self, table: &str, record_id: &str) -> Option<FieldMap> {
        self.lock()
            .tables
            .get(table)
            .and_then(|t| t.get(record_id))
            .cloned()
    }

    /// All records of a table, ordered by record id.
    pub fn records(&self, table: &str) -> Vec<(String, FieldMap)> {
        let state = self.lock();
        let mut records: Vec<_> = state
            .tables
            .get(table)
            .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();
        records.sort_by(|a, b| a.0.cmp(&b.0));
        records
    }

    /// Journal of every call, in order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Status labels written to a record, in order. Failed writes included.
    pub fn status_history(&self, table: &str, record_id: &str) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                StoreCall::Update {
                    table: t,
                    record_id: r,
                    fields: f,
                } if t == table && r == record_id => f
                    .get(task_fields::STATUS)
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_record(&self, table_id: &str, record_id: &str) -> AnalysisResult<Record> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Get {
            table: table_id.to_string(),
            record_id: record_id.to_string(),
        });
        let fields = state
            .tables
            .get(table_id)
            .and_then(|t| t.get(record_id))
            .cloned()
            .ok_or_else(|| BitableError::NotFound(format!("{}/{}", table_id, record_id)))?;
        Ok(Record {
            record_id: record_id.to_string(),
            fields,
        })
    }

    async fn update_record(
        &self,
        table_id: &str,
        record_id: &str,
        fields: &FieldMap,
    ) -> AnalysisResult<()> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Update {
            table: table_id.to_string(),
            record_id: record_id.to_string(),
            fields: fields.clone(),
        });

        let status = fields.get(task_fields::STATUS).and_then(|v| v.as_str());
        if let Some(label) = status {
            if state.failing_statuses.contains(label) {
                return Err(BitableError::Http {
                    status: 503,
                    body: format!("update to {} rejected", label),
                }
                .into());
            }
        }

        let record = state
            .tables
            .get_mut(table_id)
            .and_then(|t| t.get_mut(record_id))
            .ok_or_else(|| BitableError::NotFound(format!("{}/{}", table_id, record_id)))?;
        for (key, value) in fields {
            record.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    async fn create_record(&self, table_id: &str, fields: &FieldMap) -> AnalysisResult<String> {
        let mut state = self.lock();
        state.calls.push(StoreCall::Create {
            table: table_id.to_string(),
            fields: fields.clone(),
        });
        state.next_id += 1;
        let record_id = format!("recMem{:04}", state.next_id);
        state
            .tables
            .entry(table_id.to_string())
            .or_default()
            .insert(record_id.clone(), fields.clone());
        Ok(record_id)
    }

    async fn resolve_download_url(&self, file_token: &str) -> AnalysisResult<String> {
        let mut state = self.lock();
        state.calls.push(StoreCall::ResolveDownloadUrl {
            file_token: file_token.to_string(),
        });
        state
            .download_urls
            .get(file_token)
            .cloned()
            .ok_or_else(|| BitableError::invalid_response(format!("no download url for {}", file_token)).into())
    }
}

// =============================================================================
// Inference
// =============================================================================

/// Inference engine answering from a queue of scripted replies.
#[derive(Default)]
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<(String, InlineMedia)>>,
}

impl ScriptedInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(&self, text: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Ok(text.into()));
        self
    }

    /// Queue a failed call.
    pub fn fail(&self, message: impl Into<String>) -> &Self {
        self.lock_replies().push_back(Err(message.into()));
        self
    }

    /// Prompts and media received so far.
    pub fn requests(&self) -> Vec<(String, InlineMedia)> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String, String>>> {
        self.replies.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl InferenceEngine for ScriptedInference {
    async fn generate(&self, prompt: &str, media: &InlineMedia) -> AnalysisResult<String> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((prompt.to_string(), media.clone()));

        match self.lock_replies().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AnalysisError::inference(message)),
            None => Err(AnalysisError::inference("no scripted reply left")),
        }
    }
}

// =============================================================================
// Media
// =============================================================================

/// Media fetcher serving fixed responses per URL.
#[derive(Default)]
pub struct StaticMediaFetcher {
    media: Mutex<HashMap<String, Result<FetchedMedia, String>>>,
    fetched: Mutex<Vec<String>>,
}

impl StaticMediaFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` with `content_type` at `url`.
    pub fn serve(&self, url: &str, bytes: &[u8], content_type: Option<&str>) -> &Self {
        self.media.lock().unwrap_or_else(|e| e.into_inner()).insert(
            url.to_string(),
            Ok(FetchedMedia {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            }),
        );
        self
    }

    /// Fail transfers of `url` with `reason`.
    pub fn fail(&self, url: &str, reason: &str) -> &Self {
        self.media
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(url.to_string(), Err(reason.to_string()));
        self
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl MediaFetcher for StaticMediaFetcher {
    async fn fetch(&self, url: &str) -> AnalysisResult<FetchedMedia> {
        self.fetched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        match self
            .media
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
        {
            Some(Ok(media)) => Ok(media.clone()),
            Some(Err(reason)) => Err(AnalysisError::download(reason.clone())),
            None => Err(AnalysisError::download("Not Found")),
        }
    }
}
