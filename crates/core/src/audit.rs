//! AuditSink trait: the write-only record of every query.
//!
//! Sinks see the inputs, the assembled prompt and the raw response of each
//! call. They never influence control flow: the orchestrator discards their
//! errors after logging them.

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

/// What kind of query produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    Choice,
    Open,
    Compression,
}

impl std::fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Choice => write!(f, "choice"),
            Self::Open => write!(f, "open"),
            Self::Compression => write!(f, "compression"),
        }
    }
}

/// Records named variables, assembled prompts and raw responses.
///
/// Implementations must be safe to call from concurrent queries.
pub trait AuditSink: Send + Sync {
    /// Record a named value with a short description.
    fn store_variable(&self, key: &str, value: serde_json::Value, description: &str) -> Result<(), AuditError>;

    /// Record a prompt exactly as sent, with the context and the original ask.
    fn store_prompt(&self, prompt: &str, context: &str, question: &str) -> Result<(), AuditError>;

    /// Record a raw model response.
    fn store_response(&self, response: &str, kind: ResponseKind) -> Result<(), AuditError>;
}

/// A sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn store_variable(&self, _key: &str, _value: serde_json::Value, _description: &str) -> Result<(), AuditError> {
        Ok(())
    }

    fn store_prompt(&self, _prompt: &str, _context: &str, _question: &str) -> Result<(), AuditError> {
        Ok(())
    }

    fn store_response(&self, _response: &str, _kind: ResponseKind) -> Result<(), AuditError> {
        Ok(())
    }
}
