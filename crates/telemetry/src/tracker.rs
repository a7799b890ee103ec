//! Thread-safe audit tracker: groups every variable, prompt and response
//! by stage so a run can be inspected or exported afterwards.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use promptgate_core::{AuditError, AuditSink, ResponseKind};
use tracing::{debug, info};

use crate::TelemetryError;
use crate::model::*;

/// Stage name used when records arrive before any stage was started.
pub const DEFAULT_STAGE: &str = "default";

/// Records query inputs and outputs, grouped by stage.
///
/// Records always land in the current stage. If nothing has been started
/// yet, the tracker's default stage is started on the first write.
pub struct ContextTracker {
    default_stage: String,
    state: RwLock<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    stages: HashMap<String, Stage>,
    /// Stage names in first-start order.
    order: Vec<String>,
    current: Option<String>,
}

impl TrackerState {
    fn start(&mut self, name: &str) {
        if !self.stages.contains_key(name) {
            self.stages.insert(name.to_string(), Stage::new(name));
            self.order.push(name.to_string());
        }
        self.current = Some(name.to_string());
    }

    fn current_mut(&mut self, default_stage: &str) -> &mut Stage {
        let name = match self.current.clone() {
            Some(name) if self.stages.contains_key(&name) => name,
            _ => {
                self.start(default_stage);
                default_stage.to_string()
            }
        };
        self.stages.entry(name.clone()).or_insert_with(|| Stage::new(name))
    }
}

impl ContextTracker {
    /// Create a tracker whose fallback stage is `default`.
    pub fn new() -> Self {
        Self::with_default_stage(DEFAULT_STAGE)
    }

    /// Create a tracker with a custom fallback stage name.
    pub fn with_default_stage(name: impl Into<String>) -> Self {
        Self {
            default_stage: name.into(),
            state: RwLock::new(TrackerState::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, TrackerState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, TrackerState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Stages ────────────────────────────────────────────────────────

    /// Make `name` the current stage, creating it on first use.
    ///
    /// Restarting an existing stage keeps its records and its position.
    pub fn start_stage(&self, name: &str) {
        self.write().start(name);
        debug!(stage = name, "Started tracking stage");
    }

    /// Name of the stage records currently go to, if one is active.
    pub fn current_stage(&self) -> Option<String> {
        self.read().current.clone()
    }

    // ── Recording ─────────────────────────────────────────────────────

    /// Store a variable in the current stage, replacing any earlier value.
    pub fn record_variable(&self, name: &str, value: &serde_json::Value, description: &str) {
        let record = VariableRecord::from_value(value, description);
        let size = record.size;
        let mut state = self.write();
        let stage = state.current_mut(&self.default_stage);
        stage.variables.insert(name.to_string(), record);
        debug!(variable = name, size, stage = %stage.name, "Stored variable");
    }

    /// Store a prompt in the current stage.
    pub fn record_prompt(&self, prompt: &str, context: &str, question: &str) {
        let record = PromptRecord::new(prompt, context, question);
        let mut state = self.write();
        let stage = state.current_mut(&self.default_stage);
        debug!(size = record.combined_size, stage = %stage.name, "Stored prompt");
        stage.prompts.push(record);
    }

    /// Store a response in the current stage.
    pub fn record_response(&self, response: &str, kind: ResponseKind) {
        let record = ResponseRecord::new(response, kind);
        let mut state = self.write();
        let stage = state.current_mut(&self.default_stage);
        debug!(%kind, size = record.size, stage = %stage.name, "Stored response");
        stage.responses.push(record);
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Summary of one stage.
    pub fn stage_summary(&self, name: &str) -> Result<StageSummary, TelemetryError> {
        self.read()
            .stages
            .get(name)
            .map(Stage::summary)
            .ok_or_else(|| TelemetryError::UnknownStage(name.to_string()))
    }

    /// Summaries of every stage, in start order.
    pub fn all_stages(&self) -> Vec<StageSummary> {
        let state = self.read();
        state
            .order
            .iter()
            .filter_map(|name| state.stages.get(name))
            .map(Stage::summary)
            .collect()
    }

    /// Every stage's value for `name`, in stage order.
    pub fn variable_history(&self, name: &str) -> Vec<(String, VariableRecord)> {
        let state = self.read();
        state
            .order
            .iter()
            .filter_map(|stage| {
                state
                    .stages
                    .get(stage)
                    .and_then(|s| s.variables.get(name))
                    .map(|v| (stage.clone(), v.clone()))
            })
            .collect()
    }

    /// Totals across every stage.
    pub fn total_stats(&self) -> TotalStats {
        let state = self.read();
        let stages = state.stages.values();
        TotalStats {
            num_stages: state.stages.len(),
            total_variables: stages.clone().map(|s| s.variables.len()).sum(),
            total_prompts: stages.clone().map(|s| s.prompts.len()).sum(),
            total_responses: stages.clone().map(|s| s.responses.len()).sum(),
            total_data_size: stages.map(Stage::variable_size).sum(),
            stages: state.order.clone(),
        }
    }

    /// Full tracker state for report rendering.
    pub fn export_for_report(&self) -> AuditExport {
        let stats = self.total_stats();
        AuditExport {
            stage_order: stats.stages.clone(),
            stats,
            stages: self.all_stages(),
            timestamp: Utc::now(),
        }
    }

    /// Write [`export_for_report`](Self::export_for_report) to `path` as pretty JSON.
    pub fn export_to_file(&self, path: &Path) -> Result<(), TelemetryError> {
        let json = serde_json::to_string_pretty(&self.export_for_report())?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        info!(path = %path.display(), "Exported audit trail");
        Ok(())
    }

    /// Drop every stage and record.
    pub fn reset(&self) {
        *self.write() = TrackerState::default();
        info!("Context tracker reset");
    }
}

impl Default for ContextTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for ContextTracker {
    fn store_variable(&self, key: &str, value: serde_json::Value, description: &str) -> Result<(), AuditError> {
        self.record_variable(key, &value, description);
        Ok(())
    }

    fn store_prompt(&self, prompt: &str, context: &str, question: &str) -> Result<(), AuditError> {
        self.record_prompt(prompt, context, question);
        Ok(())
    }

    fn store_response(&self, response: &str, kind: ResponseKind) -> Result<(), AuditError> {
        self.record_response(response, kind);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_write_starts_default_stage() {
        let tracker = ContextTracker::new();
        assert!(tracker.current_stage().is_none());

        tracker.record_variable("q", &json!("Which?"), "question");
        assert_eq!(tracker.current_stage().as_deref(), Some("default"));
        assert_eq!(tracker.total_stats().stages, vec!["default"]);
    }

    #[test]
    fn custom_default_stage() {
        let tracker = ContextTracker::with_default_stage("cli");
        tracker.record_response("ok", ResponseKind::Open);
        assert_eq!(tracker.stage_summary("cli").unwrap().num_responses, 1);
    }

    #[test]
    fn records_go_to_current_stage() {
        let tracker = ContextTracker::new();
        tracker.start_stage("select");
        tracker.record_prompt("prompt", "ctx", "q");
        tracker.start_stage("write");
        tracker.record_response("done", ResponseKind::Open);
        tracker.record_response("more", ResponseKind::Open);

        let select = tracker.stage_summary("select").unwrap();
        assert_eq!(select.num_prompts, 1);
        assert_eq!(select.num_responses, 0);
        assert_eq!(select.prompts[0].combined_size, 10);

        let write = tracker.stage_summary("write").unwrap();
        assert_eq!(write.num_responses, 2);
        assert_eq!(write.responses[1].response, "more");
    }

    #[test]
    fn restarting_stage_keeps_records_and_order() {
        let tracker = ContextTracker::new();
        tracker.start_stage("a");
        tracker.record_variable("x", &json!(1), "");
        tracker.start_stage("b");
        tracker.start_stage("a");
        tracker.record_variable("y", &json!(2), "");

        assert_eq!(tracker.stage_summary("a").unwrap().num_variables, 2);
        let names: Vec<_> = tracker.all_stages().into_iter().map(|s| s.stage_name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn unknown_stage_is_an_error() {
        let tracker = ContextTracker::new();
        let err = tracker.stage_summary("missing").unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownStage(ref s) if s == "missing"));
    }

    #[test]
    fn variable_overwrite_within_stage() {
        let tracker = ContextTracker::new();
        tracker.record_variable("answer", &json!("first"), "");
        tracker.record_variable("answer", &json!("second"), "");

        let summary = tracker.stage_summary("default").unwrap();
        assert_eq!(summary.num_variables, 1);
        assert_eq!(summary.variables["answer"].content, "second");
    }

    #[test]
    fn variable_history_follows_stage_order() {
        let tracker = ContextTracker::new();
        for (stage, value) in [("one", "a"), ("two", "b"), ("three", "c")] {
            tracker.start_stage(stage);
            if stage != "two" {
                tracker.record_variable("plan", &json!(value), "");
            }
        }

        let history = tracker.variable_history("plan");
        let stages: Vec<_> = history.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(stages, vec!["one", "three"]);
        assert_eq!(history[1].1.content, "c");
        assert!(tracker.variable_history("nothing").is_empty());
    }

    #[test]
    fn total_stats_sums_variable_sizes() {
        let tracker = ContextTracker::new();
        tracker.start_stage("a");
        tracker.record_variable("x", &json!("1234"), "");
        tracker.record_prompt("p", "", "");
        tracker.start_stage("b");
        tracker.record_variable("y", &json!("56"), "");
        tracker.record_response("r", ResponseKind::Choice);

        let stats = tracker.total_stats();
        assert_eq!(stats.num_stages, 2);
        assert_eq!(stats.total_variables, 2);
        assert_eq!(stats.total_prompts, 1);
        assert_eq!(stats.total_responses, 1);
        assert_eq!(stats.total_data_size, 6);
    }

    #[test]
    fn audit_sink_impl_records() {
        let tracker = ContextTracker::new();
        let sink: &dyn AuditSink = &tracker;
        sink.store_variable("choice_options", json!(["A", "B"]), "Options").unwrap();
        sink.store_prompt("full prompt", "", "q").unwrap();
        sink.store_response("1", ResponseKind::Choice).unwrap();

        let summary = tracker.stage_summary("default").unwrap();
        assert_eq!(summary.variables["choice_options"].value_type, "array");
        assert_eq!(summary.responses[0].kind, ResponseKind::Choice);
    }

    #[test]
    fn export_to_file_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.json");

        let tracker = ContextTracker::new();
        tracker.start_stage("s1");
        tracker.record_response("hello", ResponseKind::Open);
        tracker.export_to_file(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let export: AuditExport = serde_json::from_str(&raw).unwrap();
        assert_eq!(export.stage_order, vec!["s1"]);
        assert_eq!(export.stats.total_responses, 1);
        assert_eq!(export.stages[0].responses[0].response, "hello");
    }

    #[test]
    fn reset_clears_everything() {
        let tracker = ContextTracker::new();
        tracker.start_stage("x");
        tracker.record_prompt("p", "c", "q");
        tracker.reset();

        assert!(tracker.current_stage().is_none());
        assert_eq!(tracker.total_stats(), TotalStats::default());
    }
}
