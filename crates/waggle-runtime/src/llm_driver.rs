//! [`LlmDriver`] – OpenAI-compatible request channel.
//!
//! Talks to a model server exposing `/v1/chat/completions`, such as
//! [Ollama](https://ollama.com) (`http://localhost:11434`).  The engine only
//! depends on the [`DecisionSource`] trait, so tests and alternative
//! backends can stand in for the HTTP client.
//!
//! # Example
//!
//! ```rust,no_run
//! use waggle_runtime::llm_driver::{ChatMessage, DecisionSource, LlmDriver, Role};
//!
//! # async fn demo() -> Result<(), waggle_runtime::llm_driver::LlmError> {
//! let driver = LlmDriver::new("http://localhost:11434", "llama3");
//! let reply = driver
//!     .submit(vec![ChatMessage { role: Role::User, content: "Where next?".into() }])
//!     .await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use waggle_types::WaggleError;

// ─────────────────────────────────────────────────────────────────────────────
// Response rules
// ─────────────────────────────────────────────────────────────────────────────

/// Format rules appended to every system message, whoever built the
/// conversation.
pub const RESPONSE_FORMAT_RULES: &str = "\
## Response rules
- Reply with exactly two lines: a short reason, then the decision line.
- Never repeat the same reason more than 3 times in a row.
- Gesture durations must add up to exactly 5 seconds.
- Keep angles inside their ranges: wave vertical 0-180, look vertical 0-30.";

/// Why a request produced no reply text.
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport failure, timeout or non-2xx status.
    #[error("model server request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model server reply unusable: {0}")]
    BadResponse(String),
}

impl From<LlmError> for WaggleError {
    fn from(e: LlmError) -> Self {
        WaggleError::RequestChannelFailure(e.to_string())
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Sampling temperature sent with every request.
const TEMPERATURE: f32 = 0.7;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<ReplyChoice>,
}

#[derive(Deserialize)]
struct ReplyChoice {
    message: ChatMessage,
}

/// Append [`RESPONSE_FORMAT_RULES`] to every system message, prepending a
/// system message holding only the rules when there is none.
pub fn augment(messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let mut augmented: Vec<ChatMessage> = messages
        .into_iter()
        .map(|m| match m.role {
            Role::System => ChatMessage {
                role: Role::System,
                content: format!("{}\n\n{}", m.content, RESPONSE_FORMAT_RULES),
            },
            _ => m,
        })
        .collect();
    if !augmented.iter().any(|m| m.role == Role::System) {
        augmented.insert(
            0,
            ChatMessage {
                role: Role::System,
                content: RESPONSE_FORMAT_RULES.to_string(),
            },
        );
    }
    augmented
}

// ─────────────────────────────────────────────────────────────────────────────
// DecisionSource
// ─────────────────────────────────────────────────────────────────────────────

/// Anything that can turn a conversation into a raw decision response.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Submit `messages` and return the reply text.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] when the request fails or the reply is
    /// unusable.
    async fn submit(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError>;
}

/// HTTP client for an OpenAI-compatible chat-completions endpoint.
pub struct LlmDriver {
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl LlmDriver {
    /// Driver for `model` at `base_url` (e.g. `"http://localhost:11434"`).
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Like [`LlmDriver::new`], but every request gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the HTTP client cannot be built.
    pub fn with_timeout(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl DecisionSource for LlmDriver {
    async fn submit(&self, messages: Vec<ChatMessage>) -> Result<String, LlmError> {
        let messages = augment(messages);
        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: TEMPERATURE,
            stream: false,
        };
        debug!(model = %self.model, messages = messages.len(), "submitting decision request");

        let reply: CompletionReply = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        first_text(reply)
    }
}

fn first_text(reply: CompletionReply) -> Result<String, LlmError> {
    match reply.choices.into_iter().next() {
        Some(choice) if !choice.message.content.trim().is_empty() => Ok(choice.message.content),
        Some(_) => Err(LlmError::BadResponse("blank completion".into())),
        None => Err(LlmError::BadResponse("no choices in reply".into())),
    }
}
