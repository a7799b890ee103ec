//! Data model for audit stages, stored records, and call metrics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use promptgate_core::ResponseKind;
use serde::{Deserialize, Serialize};

// ── Records ───────────────────────────────────────────────────────────────

/// A named value captured during a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableRecord {
    /// String rendering of the value. Arrays and objects are pretty JSON.
    pub content: String,
    /// What the value is for.
    pub description: String,
    pub timestamp: DateTime<Utc>,
    /// JSON type of the original value (`string`, `array`, `object`, ...).
    pub value_type: String,
    /// Length of `content` in characters.
    pub size: usize,
}

impl VariableRecord {
    /// Render a JSON value for storage.
    pub fn from_value(value: &serde_json::Value, description: &str) -> Self {
        use serde_json::Value;

        let (content, value_type) = match value {
            Value::String(s) => (s.clone(), "string"),
            Value::Array(_) | Value::Object(_) => (
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
                if value.is_array() { "array" } else { "object" },
            ),
            Value::Number(n) => (n.to_string(), "number"),
            Value::Bool(b) => (b.to_string(), "bool"),
            Value::Null => ("null".to_string(), "null"),
        };

        Self {
            size: content.chars().count(),
            content,
            description: description.to_string(),
            timestamp: Utc::now(),
            value_type: value_type.to_string(),
        }
    }
}

/// A prompt exactly as it was sent to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub timestamp: DateTime<Utc>,
    pub prompt: String,
    pub context: String,
    pub question: String,
    /// Characters across prompt, context and question.
    pub combined_size: usize,
}

impl PromptRecord {
    pub fn new(prompt: &str, context: &str, question: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            combined_size: prompt.chars().count() + context.chars().count() + question.chars().count(),
            prompt: prompt.to_string(),
            context: context.to_string(),
            question: question.to_string(),
        }
    }
}

/// A raw model response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub timestamp: DateTime<Utc>,
    pub response: String,
    pub kind: ResponseKind,
    pub size: usize,
}

impl ResponseRecord {
    pub fn new(response: &str, kind: ResponseKind) -> Self {
        Self {
            timestamp: Utc::now(),
            response: response.to_string(),
            kind,
            size: response.chars().count(),
        }
    }
}

// ── Stages ────────────────────────────────────────────────────────────────

/// Everything recorded while one stage was current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub started_at: DateTime<Utc>,
    /// Latest value per variable name. Re-storing a name overwrites it.
    pub variables: BTreeMap<String, VariableRecord>,
    pub prompts: Vec<PromptRecord>,
    pub responses: Vec<ResponseRecord>,
}

impl Stage {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started_at: Utc::now(),
            variables: BTreeMap::new(),
            prompts: Vec::new(),
            responses: Vec::new(),
        }
    }

    /// Sum of stored variable sizes.
    pub fn variable_size(&self) -> usize {
        self.variables.values().map(|v| v.size).sum()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            stage_name: self.name.clone(),
            timestamp: self.started_at,
            num_variables: self.variables.len(),
            num_prompts: self.prompts.len(),
            num_responses: self.responses.len(),
            total_variable_size: self.variable_size(),
            variables: self.variables.clone(),
            prompts: self.prompts.clone(),
            responses: self.responses.clone(),
        }
    }
}

/// Counts plus full contents of one stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
    pub stage_name: String,
    pub timestamp: DateTime<Utc>,
    pub num_variables: usize,
    pub num_prompts: usize,
    pub num_responses: usize,
    pub total_variable_size: usize,
    pub variables: BTreeMap<String, VariableRecord>,
    pub prompts: Vec<PromptRecord>,
    pub responses: Vec<ResponseRecord>,
}

/// Totals across every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalStats {
    pub num_stages: usize,
    pub total_variables: usize,
    pub total_prompts: usize,
    pub total_responses: usize,
    /// Sum of variable sizes; prompts and responses are not counted.
    pub total_data_size: usize,
    /// Stage names in the order they were first started.
    pub stages: Vec<String>,
}

/// The full tracker state, shaped for report rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExport {
    pub stats: TotalStats,
    pub stages: Vec<StageSummary>,
    pub stage_order: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

// ── Metrics ───────────────────────────────────────────────────────────────

/// One recorded model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub timestamp: DateTime<Utc>,
    /// Operation type, e.g. `choice` or `open`.
    pub kind: String,
    /// Short description of the call.
    pub name: String,
    /// 1-based position in the session.
    pub call_number: u64,
}

/// Snapshot of the call counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_calls: u64,
    pub runtime_seconds: f64,
    pub operations: Vec<CallRecord>,
}
