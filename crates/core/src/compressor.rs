//! ContextCompressor trait: shrinks oversized context before it is sent.
//!
//! Compression is an optimization, never a correctness requirement: callers
//! fall back to the original context when a compressor fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CompressionError;

/// The outcome of an explicit compression pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionOutcome {
    /// The shrunk context.
    pub compressed_text: String,
    /// How many summarization rounds ran.
    pub compression_rounds: u32,
    /// Size of the input, in characters.
    pub original_chars: usize,
    /// Size of `compressed_text`, in characters.
    pub compressed_chars: usize,
}

impl CompressionOutcome {
    /// Build an outcome, measuring both texts.
    pub fn new(original: &str, compressed_text: String, compression_rounds: u32) -> Self {
        Self {
            original_chars: original.chars().count(),
            compressed_chars: compressed_text.chars().count(),
            compressed_text,
            compression_rounds,
        }
    }

    /// Human-readable size change, e.g. `"12000 → 3000 chars (75.0% smaller)"`.
    pub fn size_delta(&self) -> String {
        describe_size_delta(self.original_chars, self.compressed_chars)
    }
}

/// Describe how a text changed size.
pub fn describe_size_delta(original_chars: usize, compressed_chars: usize) -> String {
    if original_chars == 0 {
        return format!("{original_chars} → {compressed_chars} chars");
    }
    let ratio = 1.0 - compressed_chars as f64 / original_chars as f64;
    let label = if ratio >= 0.0 { "smaller" } else { "larger" };
    format!(
        "{original_chars} → {compressed_chars} chars ({:.1}% {label})",
        ratio.abs() * 100.0
    )
}

/// Decides whether context must shrink and performs the shrinking.
#[async_trait]
pub trait ContextCompressor: Send + Sync {
    /// Cheap pre-check: return the context to use and whether it was compressed.
    ///
    /// `intended_prompt` is the prompt the context will accompany, so the
    /// implementation can account for its size.
    async fn auto_compress_for_query(
        &self,
        context: &str,
        intended_prompt: &str,
    ) -> Result<(String, bool), CompressionError>;

    /// Compress `context`, keeping what matters for `anchor`, in at most `max_rounds` rounds.
    async fn compress(
        &self,
        context: &str,
        anchor: &str,
        max_rounds: u32,
    ) -> Result<CompressionOutcome, CompressionError>;
}
