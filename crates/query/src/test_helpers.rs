//! Shared test doubles for orchestrator and compressor tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use promptgate_core::{
    AuditError, AuditSink, ChunkReceiver, CompressionError, CompressionOutcome, ContextCompressor, Message,
    Provider, ProviderError, ProviderRequest, ProviderResponse, ResponseKind, StreamChunk,
};

/// One scripted backend reply.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Stream these fragments, then finish.
    Fragments(Vec<String>),
    /// Fail before any fragment is produced.
    Fail(ProviderError),
    /// Stream these fragments, then fail.
    FailAfter(Vec<String>, ProviderError),
}

/// A provider that streams scripted replies in order and records requests.
///
/// Returns `NotConfigured` once the script runs out.
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one single-fragment reply per item.
    pub fn with_replies<'a>(self, replies: impl IntoIterator<Item = &'a str>) -> Self {
        for reply in replies {
            self.push(Reply::Fragments(vec![reply.to_string()]));
        }
        self
    }

    /// Queue a reply streamed as several fragments.
    pub fn with_fragments(self, fragments: &[&str]) -> Self {
        self.push(Reply::Fragments(fragments.iter().map(|f| f.to_string()).collect()));
        self
    }

    pub fn with_failure(self, error: ProviderError) -> Self {
        self.push(Reply::Fail(error));
        self
    }

    pub fn with_mid_stream_failure(self, fragments: &[&str], error: ProviderError) -> Self {
        self.push(Reply::FailAfter(
            fragments.iter().map(|f| f.to_string()).collect(),
            error,
        ));
        self
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Content of the single user message of every request, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .map(|r| r.messages.into_iter().map(|m| m.content).collect::<String>())
            .collect()
    }

    fn next_reply(&self, request: ProviderRequest) -> Reply {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(ProviderError::NotConfigured("script exhausted".into())))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        match self.next_reply(request) {
            Reply::Fragments(parts) => Ok(ProviderResponse {
                message: Message::assistant(parts.concat()),
                usage: None,
                model,
            }),
            Reply::Fail(e) | Reply::FailAfter(_, e) => Err(e),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (fragments, error) = match self.next_reply(request) {
            Reply::Fragments(parts) => (parts, None),
            Reply::Fail(e) => return Err(e),
            Reply::FailAfter(parts, e) => (parts, Some(e)),
        };

        let (tx, rx) = tokio::sync::mpsc::channel(fragments.len() + 2);
        for fragment in fragments {
            tx.send(Ok(StreamChunk::text(fragment))).await.unwrap();
        }
        match error {
            Some(e) => tx.send(Err(e)).await.unwrap(),
            None => tx.send(Ok(StreamChunk::finished(None))).await.unwrap(),
        }
        Ok(rx)
    }
}

/// A single call made against an audit sink.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditEvent {
    Variable {
        key: String,
        value: serde_json::Value,
        description: String,
    },
    Prompt {
        prompt: String,
        context: String,
        question: String,
    },
    Response {
        response: String,
        kind: ResponseKind,
    },
}

/// An audit sink that keeps every call in order.
#[derive(Default)]
pub struct RecordingAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingAuditSink {
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn variable(&self, key: &str) -> Option<serde_json::Value> {
        self.events().into_iter().rev().find_map(|e| match e {
            AuditEvent::Variable { key: k, value, .. } if k == key => Some(value),
            _ => None,
        })
    }

    pub fn variable_keys(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AuditEvent::Variable { key, .. } => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn prompts(&self) -> Vec<(String, String, String)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AuditEvent::Prompt {
                    prompt,
                    context,
                    question,
                } => Some((prompt, context, question)),
                _ => None,
            })
            .collect()
    }

    pub fn responses(&self) -> Vec<(String, ResponseKind)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AuditEvent::Response { response, kind } => Some((response, kind)),
                _ => None,
            })
            .collect()
    }
}

impl AuditSink for RecordingAuditSink {
    fn store_variable(&self, key: &str, value: serde_json::Value, description: &str) -> Result<(), AuditError> {
        self.events.lock().unwrap().push(AuditEvent::Variable {
            key: key.to_string(),
            value,
            description: description.to_string(),
        });
        Ok(())
    }

    fn store_prompt(&self, prompt: &str, context: &str, question: &str) -> Result<(), AuditError> {
        self.events.lock().unwrap().push(AuditEvent::Prompt {
            prompt: prompt.to_string(),
            context: context.to_string(),
            question: question.to_string(),
        });
        Ok(())
    }

    fn store_response(&self, response: &str, kind: ResponseKind) -> Result<(), AuditError> {
        self.events.lock().unwrap().push(AuditEvent::Response {
            response: response.to_string(),
            kind,
        });
        Ok(())
    }
}

/// An audit sink that rejects every write, or panics when `panics` is set.
#[derive(Default)]
pub struct FailingAuditSink {
    pub panics: bool,
    attempts: AtomicUsize,
}

impl FailingAuditSink {
    pub fn panicking() -> Self {
        Self {
            panics: true,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail(&self) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.panics {
            panic!("audit sink exploded");
        }
        Err(AuditError::Rejected("disk full".into()))
    }
}

impl AuditSink for FailingAuditSink {
    fn store_variable(&self, _key: &str, _value: serde_json::Value, _description: &str) -> Result<(), AuditError> {
        self.fail()
    }

    fn store_prompt(&self, _prompt: &str, _context: &str, _question: &str) -> Result<(), AuditError> {
        self.fail()
    }

    fn store_response(&self, _response: &str, _kind: ResponseKind) -> Result<(), AuditError> {
        self.fail()
    }
}

/// A compressor with fixed answers that counts its calls.
pub struct ScriptedCompressor {
    pre_check: Result<(String, bool), CompressionError>,
    confirm: Result<u32, CompressionError>,
    pre_checks: AtomicUsize,
    compress_calls: Mutex<Vec<(String, String, u32)>>,
}

impl ScriptedCompressor {
    /// Pre-check reports nothing to compress.
    pub fn passthrough() -> Self {
        Self::with(Ok((String::new(), false)), Ok(1))
    }

    /// Pre-check compresses to `text`; the confirmatory pass reports `rounds`.
    pub fn compressing(text: &str, rounds: u32) -> Self {
        Self::with(Ok((text.to_string(), true)), Ok(rounds))
    }

    pub fn with(pre_check: Result<(String, bool), CompressionError>, confirm: Result<u32, CompressionError>) -> Self {
        Self {
            pre_check,
            confirm,
            pre_checks: AtomicUsize::new(0),
            compress_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn pre_check_count(&self) -> usize {
        self.pre_checks.load(Ordering::SeqCst)
    }

    /// `(context, anchor, max_rounds)` of every `compress` call.
    pub fn compress_calls(&self) -> Vec<(String, String, u32)> {
        self.compress_calls.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.pre_check_count() + self.compress_calls().len()
    }
}

#[async_trait]
impl ContextCompressor for ScriptedCompressor {
    async fn auto_compress_for_query(
        &self,
        context: &str,
        _intended_prompt: &str,
    ) -> Result<(String, bool), CompressionError> {
        self.pre_checks.fetch_add(1, Ordering::SeqCst);
        match &self.pre_check {
            Ok((_, false)) => Ok((context.to_string(), false)),
            other => other.clone(),
        }
    }

    async fn compress(
        &self,
        context: &str,
        anchor: &str,
        max_rounds: u32,
    ) -> Result<CompressionOutcome, CompressionError> {
        self.compress_calls
            .lock()
            .unwrap()
            .push((context.to_string(), anchor.to_string(), max_rounds));
        let rounds = self.confirm.clone()?;
        let text = match &self.pre_check {
            Ok((text, true)) => text.clone(),
            _ => context.to_string(),
        };
        Ok(CompressionOutcome::new(context, text, rounds))
    }
}
