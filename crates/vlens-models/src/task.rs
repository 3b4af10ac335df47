//! Task records.

use serde::{Deserialize, Serialize};

use crate::fields::{self, FieldMap};
use crate::task_status::TaskStatus;

/// Where the task's video bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VideoSource {
    /// Uploaded attachment, resolved through a download-URL lookup
    Attachment { file_token: String },
    /// Direct URL
    Url { url: String },
}

/// A row of the task table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub record_id: String,
    /// `None` when the status cell is empty or holds an unknown label
    pub status: Option<TaskStatus>,
    pub attachment_token: Option<String>,
    pub video_url: Option<String>,
    /// Selected persona record ids, in selection order
    pub persona_ids: Vec<String>,
}

impl TaskRecord {
    /// Decode a task from its raw field map.
    pub fn from_fields(record_id: impl Into<String>, fields: &FieldMap) -> Self {
        let status = fields::text_value(fields.get(fields::task::STATUS))
            .and_then(|label| TaskStatus::from_label(&label).ok());

        Self {
            record_id: record_id.into(),
            status,
            attachment_token: fields::first_file_token(fields.get(fields::task::VIDEO_ATTACHMENT)),
            video_url: fields::url_value(fields.get(fields::task::VIDEO_URL)),
            persona_ids: fields::linked_record_ids(fields.get(fields::task::PERSONAS)),
        }
    }

    /// Video source to analyze. The attachment wins when both are set.
    pub fn video_source(&self) -> Option<VideoSource> {
        if let Some(token) = &self.attachment_token {
            return Some(VideoSource::Attachment {
                file_token: token.clone(),
            });
        }
        self.video_url
            .as_ref()
            .map(|url| VideoSource::Url { url: url.clone() })
    }

    /// Field payload that sets the status column.
    pub fn status_fields(status: TaskStatus) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert(fields::task::STATUS.to_string(), status.label().into());
        map
    }
}
