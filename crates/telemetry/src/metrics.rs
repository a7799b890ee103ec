//! Process call counters: numbers every model call issued in a session.

use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::model::{CallRecord, MetricsSummary};

/// Counts model calls by operation type.
pub struct CallMetrics {
    state: RwLock<MetricsState>,
}

#[derive(Debug)]
struct MetricsState {
    operations: Vec<CallRecord>,
    started_at: DateTime<Utc>,
}

impl MetricsState {
    fn fresh() -> Self {
        Self {
            operations: Vec::new(),
            started_at: Utc::now(),
        }
    }

    fn runtime_seconds(&self) -> f64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
            .max(0) as f64
            / 1000.0
    }
}

impl CallMetrics {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MetricsState::fresh()),
        }
    }

    /// Record one call and return its 1-based number.
    pub fn record_ai_call(&self, kind: &str, name: &str) -> u64 {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let call_number = state.operations.len() as u64 + 1;
        state.operations.push(CallRecord {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            name: name.to_string(),
            call_number,
        });
        info!(call_number, kind, name, "AI call");
        call_number
    }

    pub fn total_calls(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).operations.len() as u64
    }

    pub fn summary(&self) -> MetricsSummary {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        MetricsSummary {
            total_calls: state.operations.len() as u64,
            runtime_seconds: state.runtime_seconds(),
            operations: state.operations.clone(),
        }
    }

    /// Multi-line summary for terminal display.
    pub fn display_summary(&self) -> String {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        if state.operations.is_empty() {
            return "No AI operations recorded.".to_string();
        }

        // Counts per type, in first-seen order
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for op in &state.operations {
            match counts.iter_mut().find(|(kind, _)| *kind == op.kind) {
                Some((_, n)) => *n += 1,
                None => counts.push((op.kind.as_str(), 1)),
            }
        }

        let mut lines = vec![
            "AI Operations Summary:".to_string(),
            format!("Total Calls: {}", state.operations.len()),
            format!("Runtime: {:.1} seconds", state.runtime_seconds()),
            String::new(),
            "Operation Types:".to_string(),
        ];
        lines.extend(counts.into_iter().map(|(kind, n)| format!("  {kind}: {n} calls")));
        lines.join("\n")
    }

    /// Zero the counters and restart the runtime clock.
    pub fn reset(&self) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = MetricsState::fresh();
        info!("Metrics reset");
    }
}

impl Default for CallMetrics {
    fn default() -> Self {
        Self::new()
    }
}
