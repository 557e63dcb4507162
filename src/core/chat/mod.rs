//! Chat-completion transport.
//!
//! Sends the conversation to an OpenAI-compatible chat-completions endpoint
//! and exposes the reply as a lazy stream of text fragments.
//!
//! # Wire Format
//!
//! Request: `POST {api_url}` with
//! `{model, messages, stream: true, max_tokens, thinking: {type: "disabled"}}`.
//!
//! Response: `text/event-stream` lines of the form `data: {json}`, terminated
//! by `data: [DONE]`. The text delta is read from `choices[0].delta.content`,
//! `choices[0].content` or `content`, in that order.
//!
//! # Error Handling
//!
//! | Condition | Result |
//! |-----------|--------|
//! | empty API key | `InvalidCredential`, no request sent |
//! | 429 after all retries | `RateLimitExceeded` |
//! | any other non-2xx | `Transport { status, body }`, not retried |
//! | malformed frame | logged and skipped |

mod client;
pub mod config;
pub mod messages;
pub mod sse;

use thiserror::Error;

pub use client::{ChatClient, FragmentStream, RateLimitInfo};
pub use config::{
    ChatConfig, DEFAULT_BACKOFF_BASE_MS, DEFAULT_CHAT_API_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOKENS, RetryPolicy,
};
pub use messages::{ChatMessage, Role};
pub use sse::{SseEvent, SseLineDecoder, parse_event_line};

/// Errors that cross the chat transport boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    /// The API key is empty or missing; no request was attempted.
    #[error("Invalid credential: API key is empty or missing")]
    InvalidCredential,

    /// The server kept answering 429 until the retry bound ran out.
    #[error("Rate limit exceeded after {attempts} attempts")]
    RateLimitExceeded { attempts: u32 },

    /// Non-2xx, non-429 response.
    #[error("Transport error ({status}): {body}")]
    Transport { status: u16, body: String },

    /// Connection-level failure (send or mid-stream read).
    #[error("Network error: {0}")]
    Network(String),

    /// A complete (non-streamed) response could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

/// Result type for chat transport operations.
pub type ChatResult<T> = Result<T, ChatError>;
