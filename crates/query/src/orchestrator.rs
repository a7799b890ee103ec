//! The query orchestrator: compression check, prompt assembly, streamed
//! call, parsing, and audit trail for `choice` and `open` queries.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use promptgate_config::AppConfig;
use promptgate_core::compressor::describe_size_delta;
use promptgate_core::{
    AuditError, AuditSink, ContextCompressor, Error, NoopAuditSink, Provider, ProviderRequest,
    ResponseKind, ResponseParser, Result, Selection,
};
use promptgate_telemetry::CallMetrics;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::audit;
use crate::compressor::LlmContextCompressor;
use crate::parser::DefaultResponseParser;
use crate::prompt::{build_choice_prompt, build_open_prompt, preview};
use crate::request::{ChoiceQuery, OpenQuery};
use crate::result::{ChoiceResult, OpenResult};
use crate::stream::collect_stream;

/// Characters of a question or prompt kept in logs and call names.
const PREVIEW_CHARS: usize = 50;

/// Context after the compression check.
struct PreparedContext {
    text: String,
    compressed: bool,
    rounds: u32,
}

impl PreparedContext {
    fn verbatim(context: &str) -> Self {
        Self {
            text: context.to_string(),
            compressed: false,
            rounds: 0,
        }
    }
}

/// Runs choice and open queries against a streaming backend.
///
/// Each query makes at most one compression pre-check, at most one
/// confirmatory compression pass, and exactly one streamed model call.
/// Audit writes are best-effort: sink errors and panics are logged and
/// never reach the caller.
pub struct QueryOrchestrator {
    /// Model backend
    provider: Arc<dyn Provider>,

    /// Model identifier sent with every request
    model: String,

    temperature: f32,

    max_tokens: Option<u32>,

    compressor: Arc<dyn ContextCompressor>,

    parser: Arc<dyn ResponseParser>,

    audit: Arc<dyn AuditSink>,

    metrics: Arc<CallMetrics>,

    /// Process-wide compression switch, checked before any compression work
    compression_enabled: AtomicBool,
}

impl QueryOrchestrator {
    /// Create an orchestrator with the default parser and compressor, and no audit trail.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let compressor = LlmContextCompressor::new(provider.clone(), model.clone(), &Default::default());
        Self {
            provider,
            model,
            temperature: 0.7,
            max_tokens: None,
            compressor: Arc::new(compressor),
            parser: Arc::new(DefaultResponseParser),
            audit: Arc::new(NoopAuditSink),
            metrics: Arc::new(CallMetrics::new()),
            compression_enabled: AtomicBool::new(true),
        }
    }

    /// Create an orchestrator from configuration.
    ///
    /// The model is the provider's own `default_model` when configured,
    /// otherwise the global one.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        let model = config
            .provider(provider.name())
            .and_then(|p| p.default_model.clone())
            .unwrap_or_else(|| config.default_model.clone());
        let compressor = LlmContextCompressor::new(provider.clone(), model.clone(), &config.compression);

        Self::new(provider, model)
            .with_temperature(config.default_temperature)
            .with_max_tokens(config.default_max_tokens)
            .with_compressor(Arc::new(compressor))
            .with_compression_enabled(config.compression.enabled)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Replace the context compressor.
    pub fn with_compressor(mut self, compressor: Arc<dyn ContextCompressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Replace the response parser.
    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Record every query in `audit`.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Count calls in a shared metrics collector.
    pub fn with_metrics(mut self, metrics: Arc<CallMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn with_compression_enabled(self, enabled: bool) -> Self {
        self.compression_enabled.store(enabled, Ordering::Relaxed);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn metrics(&self) -> &Arc<CallMetrics> {
        &self.metrics
    }

    /// Turn automatic compression on or off for all subsequent queries.
    pub fn set_compression_enabled(&self, enabled: bool) {
        self.compression_enabled.store(enabled, Ordering::Relaxed);
        info!(enabled, "Context compression toggled");
    }

    pub fn compression_enabled(&self) -> bool {
        self.compression_enabled.load(Ordering::Relaxed)
    }

    // ── Queries ───────────────────────────────────────────────────────

    /// Ask the model to pick one of `query.options`.
    ///
    /// Unparseable answers are not an error: the result carries
    /// [`Selection::Unparseable`] with the first option as its value.
    /// Backend failures propagate unchanged.
    pub async fn choice(&self, query: ChoiceQuery) -> Result<ChoiceResult> {
        let ChoiceQuery {
            question,
            options,
            context,
            label,
            auto_compress,
        } = query;

        if options.is_empty() {
            return Err(Error::InvalidRequest("choice query needs at least one option".into()));
        }

        self.audit_variable(&format!("{label}_question"), json!(question), "Question asked");
        self.audit_variable(&format!("{label}_options"), json!(options), "Available options");
        if !context.is_empty() {
            self.audit_variable(&format!("{label}_context"), json!(context), "Context provided");
        }

        let prepared = if auto_compress {
            let skeleton = build_choice_prompt(&question, &options, "");
            self.prepare_context(&context, &skeleton, &question, &label).await
        } else {
            PreparedContext::verbatim(&context)
        };

        let prompt = build_choice_prompt(&question, &options, &prepared.text);
        self.audit("prompt", |sink| sink.store_prompt(&prompt, &prepared.text, &question));

        info!(
            label = %label,
            question = preview(&question, PREVIEW_CHARS),
            options = options.len(),
            "Choice query"
        );
        if prepared.compressed {
            info!(rounds = prepared.rounds, "Using compressed context");
        }
        self.metrics.record_ai_call("choice", preview(&question, PREVIEW_CHARS));

        let response = self.stream_completion(prompt, &label).await?;
        self.audit("response", |sink| sink.store_response(&response, ResponseKind::Choice));

        let parsed = self.parser.parse_choice(&response, &options);
        let selection = match parsed.selection {
            Selection::Selected(i) if i >= options.len() => {
                warn!(index = i, options = options.len(), "Parser selected a missing option");
                Selection::Unparseable
            }
            selection => selection,
        };
        let value = options[selection.index().unwrap_or(0)].clone();

        let result = ChoiceResult {
            selection,
            value,
            confidence: parsed.confidence,
            raw: response.trim().to_string(),
            context_compressed: prepared.compressed,
            compression_rounds: prepared.rounds,
        };

        self.audit_variable(
            &format!("{label}_selection"),
            json!({
                "selection": result.value,
                "confidence": result.confidence,
                "index": result.raw_index(),
            }),
            "Parsed selection",
        );

        info!(
            value = %result.value,
            confidence = format_args!("{:.2}", result.confidence),
            selected = result.is_selected(),
            "Choice resolved"
        );
        Ok(result)
    }

    /// Ask the model for free-form text.
    pub async fn open(&self, query: OpenQuery) -> Result<OpenResult> {
        let OpenQuery {
            prompt,
            context,
            label,
            auto_compress,
        } = query;

        self.audit_variable(&format!("{label}_prompt"), json!(prompt), "Prompt asked");
        if !context.is_empty() {
            self.audit_variable(&format!("{label}_context"), json!(context), "Context provided");
        }

        let prepared = if auto_compress {
            self.prepare_context(&context, &prompt, &prompt, &label).await
        } else {
            PreparedContext::verbatim(&context)
        };

        let full_prompt = build_open_prompt(&prompt, &prepared.text);
        self.audit("prompt", |sink| sink.store_prompt(&full_prompt, &prepared.text, &prompt));

        info!(label = %label, prompt = preview(&prompt, PREVIEW_CHARS), "Open query");
        if prepared.compressed {
            info!(rounds = prepared.rounds, "Using compressed context");
        }
        self.metrics.record_ai_call("open", preview(&prompt, PREVIEW_CHARS));

        let response = self.stream_completion(full_prompt, &label).await?;
        self.audit("response", |sink| sink.store_response(&response, ResponseKind::Open));

        let content = self.parser.clean(&response);
        self.audit_variable(&format!("{label}_content"), json!(content), "Cleaned response");

        info!(chars = content.len(), "Open response received");
        Ok(OpenResult {
            content,
            raw: response.trim().to_string(),
            context_compressed: prepared.compressed,
            compression_rounds: prepared.rounds,
        })
    }

    // ── Internals ─────────────────────────────────────────────────────

    /// Run the compression pre-check and, if it compressed, the
    /// single-round confirmatory pass that yields the round count.
    ///
    /// Compression failures fall back to the original context.
    async fn prepare_context(
        &self,
        context: &str,
        intended_prompt: &str,
        anchor: &str,
        label: &str,
    ) -> PreparedContext {
        if context.is_empty() || !self.compression_enabled() {
            return PreparedContext::verbatim(context);
        }

        let compressed_text = match self.compressor.auto_compress_for_query(context, intended_prompt).await {
            Ok((text, true)) => text,
            Ok((_, false)) => {
                debug!(label, "Context sent uncompressed");
                return PreparedContext::verbatim(context);
            }
            Err(e) => {
                warn!(label, error = %e, "Compression pre-check failed, sending original context");
                return PreparedContext::verbatim(context);
            }
        };

        info!(label, "Context auto-compressed");

        // Always summarize the original, never the already-compressed text
        let rounds = match self.compressor.compress(context, anchor, 1).await {
            Ok(outcome) => outcome.compression_rounds.max(1),
            Err(e) => {
                warn!(label, error = %e, "Confirmatory compression pass failed, assuming one round");
                1
            }
        };

        let delta = describe_size_delta(context.chars().count(), compressed_text.chars().count());
        self.audit_variable(
            &format!("{label}_compressed_context"),
            json!(compressed_text),
            &format!("Compressed context ({delta})"),
        );

        PreparedContext {
            text: compressed_text,
            compressed: true,
            rounds,
        }
    }

    /// Send `prompt` as a single user message and aggregate the stream.
    async fn stream_completion(&self, prompt: String, label: &str) -> Result<String> {
        let request = ProviderRequest::single_user(&self.model, prompt, label)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens);

        let rx = self.provider.stream(request).await?;
        let response = collect_stream(rx).await?;
        debug!(label, chars = response.len(), "Response streamed");
        Ok(response)
    }

    fn audit_variable(&self, key: &str, value: serde_json::Value, description: &str) {
        self.audit("variable", |sink| sink.store_variable(key, value, description));
    }

    /// Call the audit sink, swallowing its errors and panics.
    fn audit(&self, what: &str, write: impl FnOnce(&dyn AuditSink) -> std::result::Result<(), AuditError>) {
        audit::record(self.audit.as_ref(), what, write);
    }
}
