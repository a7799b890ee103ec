//! Audit tracking and call metrics for promptgate.
//!
//! [`ContextTracker`] is the standard [`AuditSink`](promptgate_core::AuditSink):
//! it groups every stored variable, prompt and response by stage and can
//! export the whole trail as JSON. [`CallMetrics`] numbers model calls for
//! end-of-run summaries.

pub mod metrics;
pub mod model;
pub mod tracker;

pub use metrics::CallMetrics;
pub use model::{
    AuditExport, CallRecord, MetricsSummary, PromptRecord, ResponseRecord, Stage, StageSummary,
    TotalStats, VariableRecord,
};
pub use tracker::{ContextTracker, DEFAULT_STAGE};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
