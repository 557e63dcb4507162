use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::core::emotion::EmotionTag;

/// Errors raised by speech synthesis.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TTSError {
    #[error("Invalid credential: synthesis API key is empty or missing")]
    InvalidCredential,

    #[error("Invalid text: {0}")]
    InvalidText(String),

    #[error("Provider error {code}: {message}")]
    Provider { code: String, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No audio data in response")]
    NoAudio,

    #[error("Audio decode error: {0}")]
    Decode(String),

    #[error("Unsafe audio URL: {0}")]
    UnsafeAudioUrl(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl TTSError {
    /// Whether the error means the synthesizer can never succeed as configured.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TTSError::InvalidCredential | TTSError::Configuration(_))
    }
}

/// Result type for synthesis operations.
pub type TTSResult<T> = Result<T, TTSError>;

/// Decoded audio payload ready for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioData {
    /// Raw encoded audio bytes.
    pub data: Bytes,
    /// Container/codec, e.g. `"wav"`, `"mp3"`.
    pub format: String,
}

impl AudioData {
    /// Wrap bytes, sniffing the container from the header.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let format = sniff_format(&data).to_string();
        Self { data, format }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Guess the audio container from its magic bytes.
pub fn sniff_format(data: &[u8]) -> &'static str {
    match data {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => "wav",
        [b'I', b'D', b'3', ..] => "mp3",
        [0xFF, b, ..] if b & 0xE0 == 0xE0 => "mp3",
        [b'O', b'g', b'g', b'S', ..] => "ogg",
        [b'f', b'L', b'a', b'C', ..] => "flac",
        _ => "bin",
    }
}

/// Text-to-speech engine used by the speech sequencer.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Pre-flight check for credentials and configuration, no I/O.
    fn check_ready(&self) -> TTSResult<()>;

    /// Stable hash of the settings that affect the produced audio.
    fn config_hash(&self) -> String;

    /// Synthesize `text` spoken with `emotion`.
    async fn synthesize(&self, text: &str, emotion: &EmotionTag) -> TTSResult<AudioData>;
}

/// Shared synthesizer handle.
pub type BoxedSynthesizer = Arc<dyn SpeechSynthesizer>;
