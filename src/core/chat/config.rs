//! Configuration types for the streaming chat-completion client.

use std::time::Duration;

use super::ChatError;

/// Default chat-completions endpoint (OpenAI-compatible GLM API).
pub const DEFAULT_CHAT_API_URL: &str = "https://open.bigmodel.cn/api/paas/v4/chat/completions";

/// Default chat model.
pub const DEFAULT_CHAT_MODEL: &str = "glm-4.5-air";

/// Default reply length cap in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 200;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default backoff step when the server sends no `Retry-After` (milliseconds).
pub const DEFAULT_BACKOFF_BASE_MS: u64 = 2000;

/// Settings for [`ChatClient`](super::ChatClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Full chat-completions URL.
    pub api_url: String,
    /// Model identifier sent in the request body.
    pub model: String,
    /// `max_tokens` request field; omitted when `None`.
    pub max_tokens: Option<u32>,
    /// Send `thinking: {type: "disabled"}` for providers with reasoning modes.
    pub disable_thinking: bool,
    /// Retry policy for rate limiting and network failures.
    pub retry: RetryPolicy,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Maximum silence between body chunks before the stream errors out.
    pub read_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CHAT_API_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            disable_thinking: true,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(30),
            read_timeout: Duration::from_secs(60),
        }
    }
}

impl ChatConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ChatError> {
        let url = url::Url::parse(&self.api_url)
            .map_err(|e| ChatError::Configuration(format!("Invalid api_url: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatError::Configuration(format!(
                "api_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ChatError::Configuration("model must not be empty".into()));
        }
        if self.max_tokens == Some(0) {
            return Err(ChatError::Configuration(
                "max_tokens must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded retry schedule.
///
/// The delay before retry `n` (1-based) is the server's `Retry-After` when
/// present, otherwise `backoff_base_ms × n`.
///
/// ```rust
/// use voxchat::core::chat::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::default();
/// assert_eq!(policy.delay_for(1, None), Duration::from_millis(2000));
/// assert_eq!(policy.delay_for(2, None), Duration::from_millis(4000));
/// assert_eq!(policy.delay_for(2, Some(500)), Duration::from_millis(500));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Linear backoff step in milliseconds.
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
        }
    }
}

impl RetryPolicy {
    /// Total number of requests that may be sent.
    #[inline]
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Whether another retry is allowed after `retries_done` retries.
    #[inline]
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32, retry_after_ms: Option<u64>) -> Duration {
        let ms = retry_after_ms
            .unwrap_or_else(|| self.backoff_base_ms.saturating_mul(u64::from(retry.max(1))));
        Duration::from_millis(ms)
    }
}
