//! Persona video analysis orchestrator.
//!
//! Reads a task from the table store, resolves its video, asks the
//! generative model for one analysis per selected persona and writes the
//! results back, keeping the task's status column current throughout.
//!
//! External services sit behind the ports in [`ports`], so the
//! orchestrator can be driven by the real clients or by the in-memory
//! adapters in [`memory`].

pub mod config;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod logging;
pub mod media;
pub mod memory;
pub mod metrics;
pub mod orchestrator;
pub mod ports;
pub mod prompt;
pub mod store;

pub use config::{AnalysisConfig, GeminiConfig, TableIds};
pub use error::{AnalysisError, AnalysisResult};
pub use gemini::GeminiClient;
pub use media::HttpMediaFetcher;
pub use orchestrator::{AnalysisOrchestrator, AnalysisSummary};
pub use ports::{FetchedMedia, InferenceEngine, InlineMedia, MediaFetcher, RecordStore};
