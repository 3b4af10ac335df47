//! Analysis metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Analysis runs by outcome (completed/failed).
    pub const RUNS_TOTAL: &str = "analysis_runs_total";

    /// Personas processed by outcome (analyzed/skipped).
    pub const PERSONAS_TOTAL: &str = "analysis_personas_total";

    /// Wall time of a full run in seconds.
    pub const DURATION_SECONDS: &str = "analysis_duration_seconds";
}

/// Record a finished run.
pub fn record_run(outcome: &'static str, duration_secs: f64) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
    histogram!(names::DURATION_SECONDS, "outcome" => outcome).record(duration_secs);
}

/// Record one persona of a run.
pub fn record_persona(outcome: &'static str) {
    counter!(names::PERSONAS_TOTAL, "outcome" => outcome).increment(1);
}
