//! # promptgate query
//!
//! Context-bounded queries over a streaming model backend. The
//! [`QueryOrchestrator`] offers two operations:
//!
//! - [`choice`](QueryOrchestrator::choice): pick one of a fixed list of
//!   options, parsed into a confidence-scored [`ChoiceResult`]
//! - [`open`](QueryOrchestrator::open): free-form text, cleaned into an
//!   [`OpenResult`]
//!
//! Before either query is sent, oversized context can be summarized by a
//! [`ContextCompressor`](promptgate_core::ContextCompressor). Every input,
//! prompt and response is written to an
//! [`AuditSink`](promptgate_core::AuditSink).
//!
//! ```ignore
//! let orchestrator = QueryOrchestrator::new(provider, "gemma3:4b");
//! let pick = orchestrator
//!     .choice(ChoiceQuery::new("Which file has the bug?", ["lib.rs", "main.rs"]))
//!     .await?;
//! println!("{} ({:.2})", pick.value, pick.confidence);
//! ```

mod audit;
pub mod budget;
pub mod compressor;
pub mod orchestrator;
pub mod parser;
pub mod prompt;
pub mod request;
pub mod result;
pub mod stream;

#[cfg(test)]
mod test_helpers;

pub use budget::{ContextBudget, estimate_tokens};
pub use compressor::LlmContextCompressor;
pub use orchestrator::QueryOrchestrator;
pub use parser::DefaultResponseParser;
pub use prompt::{build_choice_prompt, build_open_prompt};
pub use request::{ChoiceQuery, OpenQuery};
pub use result::{ChoiceResult, OpenResult, UNPARSEABLE_INDEX};
pub use stream::collect_stream;
