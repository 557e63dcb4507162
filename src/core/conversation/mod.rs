//! Conversation turns.
//!
//! A turn appends the user's message to the [`Transcript`], streams the reply
//! through the chat transport, segments it into utterances, speaks them via
//! the [`SpeechSequencer`](crate::core::sequencer::SpeechSequencer) and
//! finally appends the assistant's `"[tag] sentence"` log.

mod prompt;
mod transcript;
mod turn;


use thiserror::Error;

use crate::core::chat::ChatError;

pub use prompt::{PromptLanguage, SYSTEM_PROMPT_EN, SYSTEM_PROMPT_ZH};
pub use transcript::Transcript;
pub use turn::{DisplayCallback, TurnRunner, TurnSummary};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversationError {
    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("No message at index {index} (transcript has {len})")]
    EditOutOfRange { index: usize, len: usize },
}
