//! Streaming chat-completion client.
//!
//! # Architecture
//!
//! 1. Pre-flight: an empty credential fails with `InvalidCredential` before any I/O
//! 2. Send: POST with `stream: true`, retrying 429s and network failures
//! 3. Decode: the response body is wrapped in a pull-based fragment stream
//!
//! # Rate Limits
//!
//! - 429 responses honour `Retry-After` (seconds or `500ms`/`2s`/`1m`)
//! - Without it the delay grows linearly: `backoff_base_ms × retry`
//! - Once the retry bound is exhausted the call fails with `RateLimitExceeded`

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::ChatConfig;
use super::messages::{ChatMessage, ChatRequest, ThinkingConfig, extract_message};
use super::sse::{SseEvent, SseLineDecoder, parse_event_line};
use super::{ChatError, ChatResult};

// =============================================================================
// Constants
// =============================================================================

/// User-Agent header value for API requests.
const USER_AGENT: &str = concat!("voxchat/", env!("CARGO_PKG_VERSION"));

/// Longest malformed payload echoed into the log.
const MAX_LOGGED_PAYLOAD: usize = 200;

/// Lazy sequence of reply text fragments.
///
/// Dropping the stream drops the underlying response and releases the
/// connection, whether the stream finished, failed, or was abandoned.
pub type FragmentStream = Pin<Box<dyn Stream<Item = ChatResult<String>> + Send>>;

// =============================================================================
// Rate Limit Headers
// =============================================================================

/// Rate limit information from API response headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateLimitInfo {
    /// Remaining requests in current window.
    pub remaining_requests: Option<u32>,
    /// Retry-After value from 429 response (milliseconds).
    pub retry_after_ms: Option<u64>,
}

impl RateLimitInfo {
    /// Parse rate limit headers from HTTP response.
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        Self {
            remaining_requests: headers
                .get("x-ratelimit-remaining-requests")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok()),
            retry_after_ms: headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse_retry_after),
        }
    }

    /// Parse Retry-After header value.
    /// Can be seconds (integer) or duration string.
    pub fn parse_retry_after(s: &str) -> Option<u64> {
        let s = s.trim();
        if let Ok(secs) = s.parse::<u64>() {
            return Some(secs.saturating_mul(1000));
        }
        Self::parse_duration_string(s)
    }

    /// Parse duration strings like "1s", "500ms", "1m".
    pub fn parse_duration_string(s: &str) -> Option<u64> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.parse().ok()
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.parse::<u64>().ok().map(|v| v.saturating_mul(1000))
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.parse::<u64>().ok().map(|v| v.saturating_mul(60_000))
        } else {
            None
        }
    }
}

// =============================================================================
// Chat Client
// =============================================================================

/// Chat-completions client with streaming decode and bounded retries.
///
/// # Example
///
/// ```rust,no_run
/// use futures::StreamExt;
/// use voxchat::core::chat::{ChatClient, ChatConfig, ChatMessage};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = ChatClient::new(ChatConfig::default())?;
/// let messages = vec![ChatMessage::user("Hello!")];
/// let mut fragments = client.stream_reply(&messages, "sk-...").await?;
/// while let Some(fragment) = fragments.next().await {
///     print!("{}", fragment?);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ChatClient {
    config: ChatConfig,
    http_client: Client,
}

impl ChatClient {
    /// Create a client after validating `config`.
    pub fn new(config: ChatConfig) -> ChatResult<Self> {
        config.validate()?;

        let http_client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                ChatError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Request a streamed reply and return its text fragments.
    ///
    /// Errors returned here are the transport-boundary failures
    /// (`InvalidCredential`, `RateLimitExceeded`, `Transport`, `Network`).
    /// Once streaming, a broken connection surfaces as one `Network` item
    /// and ends the stream; malformed frames are logged and skipped.
    pub async fn stream_reply(
        &self,
        messages: &[ChatMessage],
        api_key: &str,
    ) -> ChatResult<FragmentStream> {
        let api_key = Self::check_credential(api_key)?;
        let body = self.request_body(messages, true);
        let response = self.send_with_retry(&body, api_key).await?;
        Ok(Self::decode_fragments(response))
    }

    /// Request a complete (non-streamed) reply.
    pub async fn complete(&self, messages: &[ChatMessage], api_key: &str) -> ChatResult<String> {
        let api_key = Self::check_credential(api_key)?;
        let body = self.request_body(messages, false);
        let response = self.send_with_retry(&body, api_key).await?;

        let text = response
            .text()
            .await
            .map_err(|e| ChatError::Network(format!("Failed to read response: {e}")))?;
        let json: Value = serde_json::from_str(&text)
            .map_err(|e| ChatError::Decode(format!("Invalid completion JSON: {e}")))?;

        extract_message(&json)
            .map(str::to_string)
            .ok_or_else(|| ChatError::Decode("Completion has no message content".into()))
    }

    /// Reject an empty or blank key; returns the trimmed key.
    pub(crate) fn check_credential(api_key: &str) -> ChatResult<&str> {
        let key = api_key.trim();
        if key.is_empty() {
            return Err(ChatError::InvalidCredential);
        }
        Ok(key)
    }

    fn request_body<'a>(&'a self, messages: &'a [ChatMessage], stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages,
            stream,
            max_tokens: self.config.max_tokens,
            thinking: self
                .config
                .disable_thinking
                .then(ThinkingConfig::disabled),
        }
    }

    /// Send the request, retrying 429s and network failures within the policy.
    async fn send_with_retry(
        &self,
        body: &ChatRequest<'_>,
        api_key: &str,
    ) -> ChatResult<Response> {
        let policy = self.config.retry;
        let mut retries = 0u32;

        loop {
            debug!(
                "Chat request attempt {}/{} to {}",
                retries + 1,
                policy.max_attempts(),
                self.config.api_url
            );

            let result = self
                .http_client
                .post(&self.config.api_url)
                .header("Authorization", format!("Bearer {api_key}"))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            let retry_after_ms = match result {
                Ok(response) if response.status().is_success() => {
                    if retries > 0 {
                        info!("Chat request succeeded after {} retries", retries);
                    }
                    return Ok(response);
                }
                Ok(response) if response.status() == StatusCode::TOO_MANY_REQUESTS => {
                    let rate_limit_info = RateLimitInfo::from_headers(response.headers());
                    debug!(
                        remaining_requests = ?rate_limit_info.remaining_requests,
                        retry_after_ms = ?rate_limit_info.retry_after_ms,
                        "Rate limited (429)"
                    );
                    if !policy.should_retry(retries) {
                        warn!(
                            "Rate limited (429) with no retries left after {} attempts",
                            retries + 1
                        );
                        return Err(ChatError::RateLimitExceeded {
                            attempts: retries + 1,
                        });
                    }
                    rate_limit_info.retry_after_ms
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().await.unwrap_or_default();
                    warn!("Chat API error ({}): {}", status, truncate(&body));
                    return Err(ChatError::Transport { status, body });
                }
                Err(e) => {
                    if !policy.should_retry(retries) {
                        return Err(ChatError::Network(format!("Request failed: {e}")));
                    }
                    warn!("Chat request failed on attempt {}: {}", retries + 1, e);
                    None
                }
            };

            retries += 1;
            let delay = policy.delay_for(retries, retry_after_ms);
            warn!(
                "Retry {}/{} after {}ms delay{}",
                retries,
                policy.max_retries,
                delay.as_millis(),
                if retry_after_ms.is_some() {
                    " (from Retry-After header)"
                } else {
                    " (linear backoff)"
                }
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Wrap a successful response body in a lazy fragment stream.
    fn decode_fragments(response: Response) -> FragmentStream {
        let stream = async_stream::try_stream! {
            let mut decoder = SseLineDecoder::new();
            let mut body = response.bytes_stream();
            let mut done = false;

            while let Some(chunk) = body.next().await {
                let chunk = chunk
                    .map_err(|e| ChatError::Network(format!("Stream read failed: {e}")))?;
                for line in decoder.push(&chunk) {
                    match handle_line(&line) {
                        LineOutcome::Fragment(text) => yield text,
                        LineOutcome::Done => {
                            done = true;
                            break;
                        }
                        LineOutcome::Continue => {}
                    }
                }
                if done {
                    break;
                }
            }

            if !done
                && let Some(line) = decoder.finish()
                && let LineOutcome::Fragment(text) = handle_line(&line)
            {
                yield text;
            }
            debug!("Chat stream finished");
        };
        Box::pin(stream)
    }
}

enum LineOutcome {
    Fragment(String),
    Done,
    Continue,
}

fn handle_line(line: &str) -> LineOutcome {
    match parse_event_line(line) {
        SseEvent::Delta(text) => LineOutcome::Fragment(text),
        SseEvent::Done => {
            debug!("Received [DONE] sentinel");
            LineOutcome::Done
        }
        SseEvent::Malformed { payload, error } => {
            warn!("Skipping malformed frame ({}): {}", error, truncate(&payload));
            LineOutcome::Continue
        }
        SseEvent::Empty | SseEvent::Ignored => LineOutcome::Continue,
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(MAX_LOGGED_PAYLOAD) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
