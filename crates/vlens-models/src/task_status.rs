//! Task status as stored in the task table.
//!
//! The task table keeps status in a single-select column whose option
//! labels are fixed by the table schema. This module maps between those
//! labels and a typed enum.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a status label is not one of the known options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task status label: {0}")]
pub struct TaskStatusError(pub String);

/// Analysis status of a task record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created, analysis not started
    #[default]
    Idle,
    /// Analysis is running
    InProgress,
    /// Every persona was analyzed
    Completed,
    /// Analysis aborted with an error
    Failed,
}

impl TaskStatus {
    /// Label of the single-select option in the task table.
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "未开始",
            TaskStatus::InProgress => "分析中",
            TaskStatus::Completed => "已完成",
            TaskStatus::Failed => "失败",
        }
    }

    /// Parse a single-select label back into a status.
    pub fn from_label(label: &str) -> Result<Self, TaskStatusError> {
        match label.trim() {
            "未开始" => Ok(TaskStatus::Idle),
            "分析中" => Ok(TaskStatus::InProgress),
            "已完成" => Ok(TaskStatus::Completed),
            "失败" => Ok(TaskStatus::Failed),
            other => Err(TaskStatusError(other.to_string())),
        }
    }

    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Idle => "idle",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
