//! Lark/Feishu Base REST API client.
//!
//! This crate provides:
//! - Record get/update/create against bitable tables
//! - Attachment download-URL resolution through the drive media API
//! - Personal base token authentication
//! - Tracing spans and request metrics per call

pub mod client;
pub mod error;
pub mod metrics;
pub mod types;


pub use client::{BitableClient, BitableConfig};
pub use error::{BitableError, BitableResult};
pub use types::Record;
