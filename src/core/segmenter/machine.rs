use serde::{Deserialize, Serialize};
use tracing::debug;

use super::rules::{Rule, Token, is_speakable, next_token};
use crate::core::emotion::EmotionTag;

/// Default minimum clause length (chars) before a comma may end a unit.
pub const DEFAULT_COMMA_THRESHOLD: usize = 10;

/// Segmenter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmenterConfig {
    /// Chars required before a comma-class character ends a unit.
    pub comma_threshold: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            comma_threshold: DEFAULT_COMMA_THRESHOLD,
        }
    }
}

/// One emotion-tagged, speakable unit of a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    pub emotion: EmotionTag,
    pub text: String,
}

impl Utterance {
    pub fn new(emotion: impl Into<EmotionTag>, text: impl Into<String>) -> Self {
        Self {
            emotion: emotion.into(),
            text: text.into(),
        }
    }

    /// Renders the utterance the way the assistant log stores it: `[tag] text`.
    pub fn tagged_text(&self) -> String {
        format!("[{}] {}", self.emotion, self.text)
    }
}

/// Segmenter state between fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmenterState {
    /// Buffer drained; the next text may open with a tag.
    AwaitingTagOrText,
    /// Holding a partial unit until more text arrives.
    Idle,
}

/// Streaming sentence segmenter.
///
/// Feed fragments with [`push`](Self::push) in arrival order and call
/// [`finish`](Self::finish) once the reply ends.
///
/// ```rust
/// use voxchat::core::emotion::EmotionTag;
/// use voxchat::core::segmenter::Segmenter;
///
/// let mut seg = Segmenter::default();
/// assert!(seg.push("[happy]Hel").is_empty());
/// let out = seg.push("lo there! [sad]I am");
/// assert_eq!(out.len(), 1);
/// assert_eq!(out[0].emotion, EmotionTag::Happy);
/// assert_eq!(out[0].text, "Hello there!");
/// let last = seg.finish().unwrap();
/// assert_eq!(last.emotion, EmotionTag::Sad);
/// assert_eq!(last.text, "I am");
/// ```
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    pending_tag: EmotionTag,
    buffer: String,
    state: SegmenterState,
    skipped: usize,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            pending_tag: EmotionTag::Neutral,
            buffer: String::new(),
            state: SegmenterState::AwaitingTagOrText,
            skipped: 0,
        }
    }

    pub fn state(&self) -> SegmenterState {
        self.state
    }

    /// Tag that will be attached to the next emitted utterance.
    pub fn pending_tag(&self) -> &EmotionTag {
        &self.pending_tag
    }

    /// Text received but not yet emitted.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Number of units discarded as non-speakable so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Append a fragment and return every utterance it completes.
    pub fn push(&mut self, fragment: &str) -> Vec<Utterance> {
        self.buffer.push_str(fragment);

        let mut out = Vec::new();
        loop {
            self.trim_leading_whitespace();
            if self.buffer.is_empty() {
                self.state = SegmenterState::AwaitingTagOrText;
                break;
            }

            match next_token(&self.buffer, self.config.comma_threshold) {
                Token::Tag { tag, len } => {
                    if tag != self.pending_tag {
                        debug!("Emotion tag changed: {} -> {}", self.pending_tag, tag);
                    }
                    self.pending_tag = tag;
                    self.buffer.drain(..len);
                }
                Token::Unit { rule, len } => {
                    let unit: String = self.buffer.drain(..len).collect();
                    if let Some(utterance) = self.emit(&unit, Some(rule)) {
                        out.push(utterance);
                    }
                }
                Token::NeedMore => {
                    self.state = SegmenterState::Idle;
                    break;
                }
            }
        }
        out
    }

    /// Flush whatever is still buffered as a final utterance.
    pub fn finish(&mut self) -> Option<Utterance> {
        let rest = std::mem::take(&mut self.buffer);
        self.state = SegmenterState::AwaitingTagOrText;
        self.emit(&rest, None)
    }

    /// Drop buffered text and return to the initial tag.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pending_tag = EmotionTag::Neutral;
        self.state = SegmenterState::AwaitingTagOrText;
    }

    fn emit(&mut self, unit: &str, rule: Option<Rule>) -> Option<Utterance> {
        let text = unit.trim();
        if !is_speakable(text) {
            if !text.is_empty() {
                self.skipped += 1;
                debug!("Skipping non-speakable unit {:?}", text);
            }
            return None;
        }
        debug!(
            "Utterance [{}] via {}: {} chars",
            self.pending_tag,
            rule.map(|r| r.as_str()).unwrap_or("flush"),
            text.chars().count()
        );
        Some(Utterance::new(self.pending_tag.clone(), text))
    }

    fn trim_leading_whitespace(&mut self) {
        let trimmed = self.buffer.len() - self.buffer.trim_start().len();
        if trimmed > 0 {
            self.buffer.drain(..trimmed);
        }
    }
}
