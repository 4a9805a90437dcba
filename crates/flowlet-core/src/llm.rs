// LLM driver boundary.
//
// Decision: dependency inversion - provider crates (flowlet-openai) depend
// on this crate and are wired in at process start. Workflow and activity
// code only ever sees the LlmDriver trait, so tests substitute a scripted
// driver and never touch the network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

/// Errors crossing the provider boundary.
///
/// Activities treat every variant as retryable: the caller cannot tell a
/// transient network fault from a quota rejection, and the retry policy is
/// bounded either way.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider request failed: {0}")]
    Request(String),

    #[error("provider returned malformed response: {0}")]
    MalformedResponse(String),
}

/// One part of a structured model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPart {
    Text(String),
    /// Non-text content; normalized via its JSON string form.
    Other(Value),
}

/// A model reply, either plain text or a list of parts.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmReply {
    Text(String),
    Parts(Vec<ReplyPart>),
}

impl LlmReply {
    /// Normalize the reply to a single string.
    ///
    /// Part lists join each part's text (or JSON string form) with newline
    /// separators; plain text passes through unchanged.
    pub fn into_text(self) -> String {
        match self {
            LlmReply::Text(text) => text,
            LlmReply::Parts(parts) => parts
                .into_iter()
                .map(|part| match part {
                    ReplyPart::Text(text) => text,
                    ReplyPart::Other(value) => value.to_string(),
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Capability boundary to an external chat/completion model.
///
/// Any provider implementing this is substitutable; the default model name
/// is the adapter's concern when the caller passes `None`.
#[async_trait]
pub trait LlmDriver: Send + Sync {
    /// Send a two-message exchange (system + user) and return the reply.
    async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: Option<&str>,
    ) -> Result<LlmReply, LlmError>;
}

// ============================================================================
// Scripted driver (test support)
// ============================================================================

/// Response behavior for the scripted driver.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    /// Always return the same text.
    Fixed(String),
    /// Echo the user prompt back.
    Echo,
    /// Return responses in order, repeating the last one when exhausted.
    Sequence(Vec<String>),
    /// Fail every call with a request error.
    Fail(String),
}

/// Deterministic in-process driver for tests.
///
/// Counts calls so tests can assert exactly how many model invocations a
/// workflow performed (or that none happened).
pub struct ScriptedDriver {
    response: ScriptedResponse,
    calls: AtomicUsize,
    seen_prompts: Mutex<Vec<String>>,
}

impl ScriptedDriver {
    pub fn new(response: ScriptedResponse) -> Self {
        Self {
            response,
            calls: AtomicUsize::new(0),
            seen_prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(ScriptedResponse::Fixed(text.into()))
    }

    pub fn echo() -> Self {
        Self::new(ScriptedResponse::Echo)
    }

    /// Number of `send` calls observed so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// User prompts seen, in call order.
    pub fn seen_prompts(&self) -> Vec<String> {
        self.seen_prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl LlmDriver for ScriptedDriver {
    async fn send(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        _model: Option<&str>,
    ) -> Result<LlmReply, LlmError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen_prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(user_prompt.to_string());

        match &self.response {
            ScriptedResponse::Fixed(text) => Ok(LlmReply::Text(text.clone())),
            ScriptedResponse::Echo => Ok(LlmReply::Text(user_prompt.to_string())),
            ScriptedResponse::Sequence(responses) => {
                let idx = call.min(responses.len().saturating_sub(1));
                match responses.get(idx) {
                    Some(text) => Ok(LlmReply::Text(text.clone())),
                    None => Err(LlmError::Request("empty scripted sequence".to_string())),
                }
            }
            ScriptedResponse::Fail(message) => Err(LlmError::Request(message.clone())),
        }
    }
}
