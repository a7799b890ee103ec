//! Token budget for context sent alongside a prompt.
//!
//! Uses a character-based heuristic: ~4 characters per token, rounded up.
//! It only has to be good enough to decide whether summarization is needed.

use promptgate_config::CompressionConfig;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// How much of the model window a prompt plus context may use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextBudget {
    /// Model context window, in tokens.
    pub window_tokens: usize,
    /// Share of the window input may occupy, in (0, 1].
    pub usable_fraction: f32,
    /// Tokens held back for the response.
    pub response_reserve_tokens: usize,
}

impl ContextBudget {
    pub fn new(window_tokens: usize, usable_fraction: f32, response_reserve_tokens: usize) -> Self {
        Self {
            window_tokens,
            usable_fraction,
            response_reserve_tokens,
        }
    }

    pub fn from_config(config: &CompressionConfig) -> Self {
        Self::new(
            config.context_window_tokens,
            config.usable_fraction,
            config.response_reserve_tokens,
        )
    }

    /// Input tokens available after the usable fraction and response reserve.
    pub fn usable_tokens(&self) -> usize {
        let usable = (self.window_tokens as f64 * f64::from(self.usable_fraction)).floor() as usize;
        usable.saturating_sub(self.response_reserve_tokens)
    }

    /// Estimated tokens of `context` and `prompt` together.
    pub fn required_tokens(&self, context: &str, prompt: &str) -> usize {
        estimate_tokens(context) + estimate_tokens(prompt)
    }

    /// Whether `context` and `prompt` fit together.
    pub fn fits(&self, context: &str, prompt: &str) -> bool {
        self.required_tokens(context, prompt) <= self.usable_tokens()
    }
}

impl Default for ContextBudget {
    fn default() -> Self {
        Self::from_config(&CompressionConfig::default())
    }
}
