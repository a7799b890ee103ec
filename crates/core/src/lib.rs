//! # promptgate core
//!
//! Domain types, collaborator traits, and error definitions for the
//! promptgate query orchestrator. This crate has **no framework
//! dependencies**: it defines the seams that every other crate implements.
//!
//! ## Collaborators
//!
//! The orchestrator only decides *when* to call these and *how* to combine
//! their outputs. Each one is a trait here with implementations elsewhere:
//! - [`Provider`]: the streaming model backend
//! - [`ContextCompressor`]: shrinks oversized context
//! - [`ResponseParser`]: extracts a selection or cleaned prose from raw output
//! - [`AuditSink`]: write-only record of variables, prompts and responses

pub mod audit;
pub mod compressor;
pub mod error;
pub mod message;
pub mod parser;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use audit::{AuditSink, NoopAuditSink, ResponseKind};
pub use compressor::{CompressionOutcome, ContextCompressor};
pub use error::{AuditError, CompressionError, Error, ProviderError, Result};
pub use message::{Message, Role};
pub use parser::{ParsedChoice, ResponseParser, Selection};
pub use provider::{ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
