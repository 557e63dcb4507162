//! Core emotion types for emotion-tagged replies.
//!
//! The chat model is prompted to prefix each sentence with a bracketed tag
//! such as `[happy]`. This module defines the tag vocabulary that flows from
//! the segmenter through the sequencer to the playback sink:
//!
//! - **Core tags**: the five emotions the system prompt asks for
//! - **Extended tags**: `fear` and `surprised`, which models emit unprompted
//! - **Other**: anything else is carried verbatim so the sink can decide

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest tag body (in chars) accepted as a tag token.
pub const MAX_TAG_LEN: usize = 16;

static TAG_BODY: Lazy<Regex> = Lazy::new(|| {
    // Letters plus `_`/`-`, bounded so stray bracketed prose is not mistaken for a tag.
    Regex::new(r"^\p{L}[\p{L}_-]{0,15}$").expect("tag body pattern is valid")
});

// =============================================================================
// Emotion Tag
// =============================================================================

/// Emotion attached to an utterance.
///
/// # Example
///
/// ```rust
/// use voxchat::core::emotion::EmotionTag;
///
/// let tag = EmotionTag::parse("Happy");
/// assert_eq!(tag, EmotionTag::Happy);
/// assert_eq!(tag.to_string(), "happy");
/// assert_eq!(EmotionTag::parse("smug").as_str(), "smug");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum EmotionTag {
    // =========================================================================
    // Core tags (requested by the system prompt)
    // =========================================================================
    /// Neutral, default emotional state
    #[default]
    Neutral,
    /// Happy, joyful, positive
    Happy,
    /// Angry, frustrated, annoyed
    Angry,
    /// Sad, melancholic, sorrowful
    Sad,
    /// Relaxed, calm, at ease
    Relaxed,

    // =========================================================================
    // Extended tags
    // =========================================================================
    /// Fearful, scared, anxious
    Fear,
    /// Surprised, shocked, astonished
    Surprised,

    /// Any other tag the model emitted, lowercased.
    Other(String),
}

impl EmotionTag {
    /// Returns the five tags the system prompt asks the model to use.
    #[inline]
    pub fn core() -> &'static [EmotionTag] {
        &[
            EmotionTag::Neutral,
            EmotionTag::Happy,
            EmotionTag::Angry,
            EmotionTag::Sad,
            EmotionTag::Relaxed,
        ]
    }

    /// Returns whether this is one of the tags the system prompt lists.
    #[inline]
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            EmotionTag::Neutral
                | EmotionTag::Happy
                | EmotionTag::Angry
                | EmotionTag::Sad
                | EmotionTag::Relaxed
        )
    }

    /// Returns the tag as a lowercase string.
    ///
    /// # Example
    ///
    /// ```rust
    /// use voxchat::core::emotion::EmotionTag;
    ///
    /// assert_eq!(EmotionTag::Relaxed.as_str(), "relaxed");
    /// ```
    pub fn as_str(&self) -> &str {
        match self {
            EmotionTag::Neutral => "neutral",
            EmotionTag::Happy => "happy",
            EmotionTag::Angry => "angry",
            EmotionTag::Sad => "sad",
            EmotionTag::Relaxed => "relaxed",
            EmotionTag::Fear => "fear",
            EmotionTag::Surprised => "surprised",
            EmotionTag::Other(s) => s.as_str(),
        }
    }

    /// Parses a tag body (the text between the brackets), case-insensitive.
    ///
    /// Unknown tags are preserved as [`EmotionTag::Other`]; an empty body is
    /// treated as neutral.
    pub fn parse(s: &str) -> Self {
        let lowered = s.trim().to_lowercase();
        match lowered.as_str() {
            "" | "neutral" => EmotionTag::Neutral,
            "happy" | "joy" | "joyful" => EmotionTag::Happy,
            "angry" | "anger" => EmotionTag::Angry,
            "sad" | "sadness" => EmotionTag::Sad,
            "relaxed" | "calm" => EmotionTag::Relaxed,
            "fear" | "fearful" | "scared" => EmotionTag::Fear,
            "surprised" | "surprise" => EmotionTag::Surprised,
            _ => EmotionTag::Other(lowered),
        }
    }

    /// Returns whether `body` is shaped like a tag token body.
    ///
    /// ```rust
    /// use voxchat::core::emotion::EmotionTag;
    ///
    /// assert!(EmotionTag::is_tag_body("happy"));
    /// assert!(!EmotionTag::is_tag_body("see note 3"));
    /// ```
    pub fn is_tag_body(body: &str) -> bool {
        TAG_BODY.is_match(body)
    }

    /// Prosody hint for engines that accept rate and pitch.
    pub fn prosody(&self) -> ProsodyHint {
        match self {
            EmotionTag::Neutral => ProsodyHint::new(1.0, 1.0),
            EmotionTag::Happy => ProsodyHint::new(1.1, 1.2),
            EmotionTag::Angry => ProsodyHint::new(1.2, 0.8),
            EmotionTag::Sad => ProsodyHint::new(0.9, 0.9),
            EmotionTag::Relaxed => ProsodyHint::new(0.95, 1.0),
            EmotionTag::Fear => ProsodyHint::new(1.1, 1.3),
            EmotionTag::Surprised => ProsodyHint::new(1.15, 1.4),
            EmotionTag::Other(_) => ProsodyHint::default(),
        }
    }
}

impl fmt::Display for EmotionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for EmotionTag {
    fn from(s: String) -> Self {
        EmotionTag::parse(&s)
    }
}

impl From<&str> for EmotionTag {
    fn from(s: &str) -> Self {
        EmotionTag::parse(s)
    }
}

impl From<EmotionTag> for String {
    fn from(tag: EmotionTag) -> Self {
        tag.as_str().to_string()
    }
}

// =============================================================================
// Prosody Hint
// =============================================================================

/// Relative speaking rate and pitch multipliers (1.0 = engine default).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProsodyHint {
    pub rate: f32,
    pub pitch: f32,
}

impl ProsodyHint {
    #[inline]
    pub const fn new(rate: f32, pitch: f32) -> Self {
        Self { rate, pitch }
    }

    /// Returns whether both multipliers are the engine default.
    pub fn is_default(&self) -> bool {
        (self.rate - 1.0).abs() < 0.001 && (self.pitch - 1.0).abs() < 0.001
    }
}

impl Default for ProsodyHint {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}
