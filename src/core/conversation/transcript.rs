use serde::{Deserialize, Serialize};

use super::ConversationError;
use crate::core::chat::{ChatMessage, Role};

/// Ordered chat log of one conversation, without the system prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Replace the content of message `index`, keeping its role.
    pub fn edit(&mut self, index: usize, content: impl Into<String>) -> Result<(), ConversationError> {
        let len = self.messages.len();
        let message = self
            .messages
            .get_mut(index)
            .ok_or(ConversationError::EditOutOfRange { index, len })?;
        message.content = content.into();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub(crate) fn truncate(&mut self, len: usize) {
        self.messages.truncate(len);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// Messages for a chat request: the system prompt followed by the log.
    ///
    /// Stray system messages in the log are dropped so the prompt stays unique.
    pub fn request_messages(&self, system_prompt: &str) -> Vec<ChatMessage> {
        std::iter::once(ChatMessage::system(system_prompt))
            .chain(
                self.messages
                    .iter()
                    .filter(|m| m.role != Role::System)
                    .cloned(),
            )
            .collect()
    }
}
