//! Shared data models for the VideoLens persona analysis service.
//!
//! This crate provides Serde-friendly types for:
//! - Task status labels stored in the task table
//! - Task, persona and result records
//! - Decoding of loosely typed table cells
//! - The JSON object returned by the model

pub mod analysis;
pub mod fields;
pub mod persona;
pub mod task;
pub mod task_status;

// Re-export common types
pub use analysis::{AnalysisOutput, ResultRecord};
pub use fields::FieldMap;
pub use persona::PersonaRecord;
pub use task::{TaskRecord, VideoSource};
pub use task_status::{TaskStatus, TaskStatusError};
