//! Model-backed context compressor.
//!
//! Oversized context is split into line-aligned chunks, each chunk is
//! summarized by the model with the pending question as the anchor, and the
//! summaries are joined. Rounds repeat until the result fits the budget or
//! the round limit is hit.

use std::sync::Arc;

use async_trait::async_trait;
use promptgate_config::CompressionConfig;
use promptgate_core::{
    AuditSink, CompressionError, CompressionOutcome, ContextCompressor, Provider, ProviderRequest,
    ResponseKind,
};
use tracing::{debug, info};

use crate::audit;
use crate::budget::{ContextBudget, estimate_tokens};
use crate::stream::collect_stream;

/// Temperature for summarization requests.
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Audit label attached to summarization requests.
const COMPRESSION_CONTEXT_NAME: &str = "compression";

/// Summarizes context through a [`Provider`].
pub struct LlmContextCompressor {
    provider: Arc<dyn Provider>,
    model: String,
    budget: ContextBudget,
    chunk_tokens: usize,
    max_rounds: u32,
    audit: Option<Arc<dyn AuditSink>>,
}

impl LlmContextCompressor {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, config: &CompressionConfig) -> Self {
        Self {
            provider,
            model: model.into(),
            budget: ContextBudget::from_config(config),
            chunk_tokens: config.chunk_tokens.max(1),
            max_rounds: config.max_rounds,
            audit: None,
        }
    }

    /// Record each summary as a `compression` response.
    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn budget(&self) -> &ContextBudget {
        &self.budget
    }

    async fn summarize(&self, chunk: &str, anchor: &str, part: usize, parts: usize) -> Result<String, CompressionError> {
        let prompt = summary_prompt(chunk, anchor, part, parts);
        let request = ProviderRequest::single_user(&self.model, prompt, COMPRESSION_CONTEXT_NAME)
            .with_temperature(SUMMARY_TEMPERATURE);

        let rx = self.provider.stream(request).await?;
        let summary = collect_stream(rx).await?;

        if let Some(sink) = &self.audit {
            audit::record(sink.as_ref(), "compression response", |sink| {
                sink.store_response(&summary, ResponseKind::Compression)
            });
        }

        debug!(part, parts, chunk_chars = chunk.len(), summary_chars = summary.len(), "Chunk summarized");
        Ok(summary.trim().to_string())
    }
}

fn summary_prompt(chunk: &str, anchor: &str, part: usize, parts: usize) -> String {
    format!(
        "Summarize the following text. Keep every fact, name, path and number that could matter for this question or task:\n\
         {anchor}\n\n\
         Text (part {part} of {parts}):\n\
         {chunk}\n\n\
         Reply with the summary only."
    )
}

/// Split `text` into chunks of at most `max_chars` bytes, breaking on line
/// boundaries where possible. Lines longer than `max_chars` are cut at char
/// boundaries.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split_inclusive('\n') {
        if current.len() + line.len() > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }

        if line.len() <= max_chars {
            current.push_str(line);
            continue;
        }

        // Oversized line: emit full-size pieces, keep the tail open
        let mut rest = line;
        while rest.len() > max_chars {
            let mut cut = max_chars;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }
            chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }

    if !current.trim().is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl ContextCompressor for LlmContextCompressor {
    async fn auto_compress_for_query(
        &self,
        context: &str,
        intended_prompt: &str,
    ) -> Result<(String, bool), CompressionError> {
        let required = self.budget.required_tokens(context, intended_prompt);
        let usable = self.budget.usable_tokens();

        if required <= usable {
            debug!(required, usable, "Context fits, no compression needed");
            return Ok((context.to_string(), false));
        }

        info!(required, usable, "Context exceeds budget, compressing");
        let outcome = self.compress(context, intended_prompt, self.max_rounds).await?;
        Ok((outcome.compressed_text, true))
    }

    async fn compress(
        &self,
        context: &str,
        anchor: &str,
        max_rounds: u32,
    ) -> Result<CompressionOutcome, CompressionError> {
        if max_rounds == 0 {
            return Err(CompressionError::InvalidRounds(max_rounds));
        }

        let chunk_chars = self.chunk_tokens.saturating_mul(4);
        let mut working = context.to_string();
        let mut rounds = 0;

        while rounds < max_rounds {
            rounds += 1;
            let chunks = split_chunks(&working, chunk_chars);
            let parts = chunks.len();

            let mut summaries = Vec::with_capacity(parts);
            for (i, chunk) in chunks.iter().enumerate() {
                let summary = self.summarize(chunk, anchor, i + 1, parts).await?;
                if !summary.is_empty() {
                    summaries.push(summary);
                }
            }

            if summaries.is_empty() {
                return Err(CompressionError::EmptyResult { rounds });
            }
            working = summaries.join("\n\n");

            debug!(
                round = rounds,
                chunks = parts,
                tokens = estimate_tokens(&working),
                "Compression round finished"
            );

            if self.budget.fits(&working, anchor) {
                break;
            }
        }

        let outcome = CompressionOutcome::new(context, working, rounds);
        info!(rounds, delta = %outcome.size_delta(), "Context compressed");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FailingAuditSink, RecordingAuditSink, ScriptedProvider};
    use promptgate_core::ProviderError;

    fn small_config() -> CompressionConfig {
        CompressionConfig {
            context_window_tokens: 100,
            usable_fraction: 1.0,
            response_reserve_tokens: 0,
            chunk_tokens: 50,
            max_rounds: 3,
            ..CompressionConfig::default()
        }
    }

    fn compressor(provider: Arc<ScriptedProvider>) -> LlmContextCompressor {
        LlmContextCompressor::new(provider, "test-model", &small_config())
    }

    #[test]
    fn split_on_lines() {
        let chunks = split_chunks("aaaa\nbbbb\ncccc\n", 10);
        assert_eq!(chunks, vec!["aaaa\nbbbb\n", "cccc\n"]);
    }

    #[test]
    fn split_long_line_on_char_boundaries() {
        let chunks = split_chunks("ééééé", 3);
        assert!(chunks.iter().all(|c| c.len() <= 3));
        assert_eq!(chunks.concat(), "ééééé");
    }

    #[test]
    fn split_small_text_is_one_chunk() {
        assert_eq!(split_chunks("short", 100), vec!["short"]);
        assert!(split_chunks("", 100).is_empty());
    }

    #[tokio::test]
    async fn fitting_context_is_untouched() {
        let provider = Arc::new(ScriptedProvider::new());
        let c = compressor(provider.clone());

        let (text, compressed) = c.auto_compress_for_query("tiny context", "question").await.unwrap();
        assert_eq!(text, "tiny context");
        assert!(!compressed);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn oversized_context_is_summarized() {
        // 800 chars of context at 200 chars per chunk = 4 chunks
        let line = format!("{}\n", "z".repeat(99));
        let context = line.repeat(8);
        let provider = Arc::new(ScriptedProvider::new().with_replies(["s1", "s2", "s3", "s4"]));
        let c = compressor(provider.clone());

        let (text, compressed) = c.auto_compress_for_query(&context, "Which file?").await.unwrap();
        assert!(compressed);
        assert_eq!(text, "s1\n\ns2\n\ns3\n\ns4");
        assert_eq!(provider.call_count(), 4);

        let request = &provider.requests()[0];
        assert_eq!(request.context_name.as_deref(), Some("compression"));
        assert!(request.messages[0].content.contains("Which file?"));
    }

    #[tokio::test]
    async fn rounds_repeat_until_it_fits() {
        let context = "q".repeat(500); // one oversized line → 3 chunks of 200
        let long = "w".repeat(450);
        let provider = Arc::new(
            ScriptedProvider::new().with_replies([long.as_str(), "", "", "short", "", ""]),
        );
        let c = compressor(provider.clone());

        let outcome = c.compress(&context, "anchor", 3).await.unwrap();
        assert_eq!(outcome.compression_rounds, 2);
        assert_eq!(outcome.compressed_text, "short");
        assert_eq!(outcome.original_chars, 500);
    }

    #[tokio::test]
    async fn max_rounds_bounds_work() {
        let context = "q".repeat(500);
        let long = "w".repeat(450);
        let provider = Arc::new(ScriptedProvider::new().with_replies([long.as_str(), "", ""]));
        let c = compressor(provider.clone());

        let outcome = c.compress(&context, "anchor", 1).await.unwrap();
        assert_eq!(outcome.compression_rounds, 1);
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn zero_rounds_rejected() {
        let c = compressor(Arc::new(ScriptedProvider::new()));
        let err = c.compress("ctx", "anchor", 0).await.unwrap_err();
        assert!(matches!(err, CompressionError::InvalidRounds(0)));
    }

    #[tokio::test]
    async fn empty_summaries_are_an_error() {
        let provider = Arc::new(ScriptedProvider::new().with_replies(["   "]));
        let c = compressor(provider);
        let err = c.compress("some context", "anchor", 2).await.unwrap_err();
        assert!(matches!(err, CompressionError::EmptyResult { rounds: 1 }));
    }

    #[tokio::test]
    async fn backend_failure_surfaces() {
        let provider = Arc::new(ScriptedProvider::new().with_failure(ProviderError::Network("down".into())));
        let c = compressor(provider);
        let err = c.compress("some context", "anchor", 1).await.unwrap_err();
        assert!(matches!(err, CompressionError::Backend(ProviderError::Network(_))));
    }

    #[tokio::test]
    async fn summaries_are_audited() {
        let audit = Arc::new(RecordingAuditSink::default());
        let provider = Arc::new(ScriptedProvider::new().with_replies(["summary"]));
        let c = compressor(provider).with_audit_sink(audit.clone());

        c.compress("context", "anchor", 1).await.unwrap();
        assert_eq!(audit.responses(), vec![("summary".to_string(), ResponseKind::Compression)]);
    }

    #[tokio::test]
    async fn panicking_audit_sink_does_not_abort_compression() {
        let audit = Arc::new(FailingAuditSink::panicking());
        let provider = Arc::new(ScriptedProvider::new().with_replies(["summary"]));
        let c = compressor(provider).with_audit_sink(audit.clone());

        let outcome = c.compress("context", "anchor", 1).await.unwrap();
        assert_eq!(outcome.compressed_text, "summary");
        assert_eq!(audit.attempts(), 1);
    }
}
