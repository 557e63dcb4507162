//! Wire types for the chat-completions API.
//!
//! Streaming chunks are decoded best-effort from `serde_json::Value` because
//! OpenAI-compatible providers disagree on where the text delta lives.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Conversation Messages
// =============================================================================

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One message of a conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

// =============================================================================
// Request
// =============================================================================

/// Reasoning-mode switch understood by GLM-style providers.
#[derive(Debug, Clone, Serialize)]
pub struct ThinkingConfig {
    #[serde(rename = "type")]
    pub mode: &'static str,
}

impl ThinkingConfig {
    pub const fn disabled() -> Self {
        Self { mode: "disabled" }
    }
}

/// Chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingConfig>,
}

// =============================================================================
// Responses
// =============================================================================

/// Extract the text delta from one streamed chunk.
///
/// Tried in order: `choices[0].delta.content`, `choices[0].content`,
/// top-level `content`. Empty strings count as absent.
pub fn extract_delta(chunk: &Value) -> Option<&str> {
    let first_choice = chunk.get("choices").and_then(|c| c.get(0));

    let candidates = [
        first_choice
            .and_then(|c| c.get("delta"))
            .and_then(|d| d.get("content")),
        first_choice.and_then(|c| c.get("content")),
        chunk.get("content"),
    ];

    candidates
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .find(|s| !s.is_empty())
}

/// Extract the assistant text from a non-streaming completion.
pub fn extract_message(response: &Value) -> Option<&str> {
    response
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_serialization() {
        let msg = ChatMessage::user("hi");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_request_body_shape() {
        let messages = vec![ChatMessage::system("be brief"), ChatMessage::user("hello")];
        let body = ChatRequest {
            model: "glm-4.5-air",
            messages: &messages,
            stream: true,
            max_tokens: Some(200),
            thinking: Some(ThinkingConfig::disabled()),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["model"], "glm-4.5-air");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 200);
        assert_eq!(json["thinking"]["type"], "disabled");
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn test_request_body_omits_optional_fields() {
        let body = ChatRequest {
            model: "m",
            messages: &[],
            stream: false,
            max_tokens: None,
            thinking: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("thinking").is_none());
    }

    #[test]
    fn test_extract_delta_priority() {
        let chunk = json!({"choices": [{"delta": {"content": "a"}, "content": "b"}], "content": "c"});
        assert_eq!(extract_delta(&chunk), Some("a"));

        let chunk = json!({"choices": [{"content": "b"}], "content": "c"});
        assert_eq!(extract_delta(&chunk), Some("b"));

        let chunk = json!({"content": "c"});
        assert_eq!(extract_delta(&chunk), Some("c"));
    }

    #[test]
    fn test_extract_delta_skips_empty_and_missing() {
        let chunk = json!({"choices": [{"delta": {"content": ""}}], "content": "c"});
        assert_eq!(extract_delta(&chunk), Some("c"));

        let chunk = json!({"choices": [{"delta": {"role": "assistant"}}]});
        assert_eq!(extract_delta(&chunk), None);

        let chunk = json!({"choices": [{"delta": {"content": null}, "finish_reason": "stop"}]});
        assert_eq!(extract_delta(&chunk), None);
    }

    #[test]
    fn test_extract_message() {
        let resp = json!({"choices": [{"message": {"role": "assistant", "content": "[happy]Hi!"}}]});
        assert_eq!(extract_message(&resp), Some("[happy]Hi!"));
        assert_eq!(extract_message(&json!({"choices": []})), None);
    }
}
