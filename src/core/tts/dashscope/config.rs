//! Configuration types for the DashScope (Qwen) TTS API.
//!
//! - Model selection (`qwen3-tts-flash` by default, free-form otherwise)
//! - Voice selection (five built-in voices)
//! - Language type and audio URL policy

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::tts::base::TTSError;

/// Default DashScope API host.
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com";

/// Path of the multimodal generation endpoint used for TTS.
pub const DASHSCOPE_TTS_PATH: &str = "/api/v1/services/aigc/multimodal-generation/generation";

/// Default TTS model.
pub const DEFAULT_TTS_MODEL: &str = "qwen3-tts-flash";

/// Default language type.
pub const DEFAULT_LANGUAGE_TYPE: &str = "Chinese";

// =============================================================================
// DashScope Voices
// =============================================================================

/// Built-in DashScope voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DashScopeVoice {
    #[default]
    Cherry,
    Aimei,
    Xiaoxiao,
    Yunxi,
    Yunyang,
}

impl DashScopeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cherry => "Cherry",
            Self::Aimei => "Aimei",
            Self::Xiaoxiao => "Xiaoxiao",
            Self::Yunxi => "Yunxi",
            Self::Yunyang => "Yunyang",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "cherry" => Self::Cherry,
            "aimei" => Self::Aimei,
            "xiaoxiao" => Self::Xiaoxiao,
            "yunxi" => Self::Yunxi,
            "yunyang" => Self::Yunyang,
            _ => Self::default(),
        }
    }

    /// Get all available voices.
    pub fn all() -> &'static [DashScopeVoice] {
        &[
            Self::Cherry,
            Self::Aimei,
            Self::Xiaoxiao,
            Self::Yunxi,
            Self::Yunyang,
        ]
    }
}

impl std::fmt::Display for DashScopeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Provider Configuration
// =============================================================================

/// DashScope TTS settings.
#[derive(Debug, Clone, PartialEq)]
pub struct DashScopeTTSConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// API host, without trailing path.
    pub base_url: String,
    /// Model name.
    pub model: String,
    pub voice: DashScopeVoice,
    /// `language_type` request field (e.g. `Chinese`, `English`).
    pub language_type: String,
    /// Allow fetching audio from private/loopback addresses.
    pub allow_private_audio_urls: bool,
    /// Per-request timeout (synthesis call and audio download).
    pub timeout: Duration,
}

impl Default for DashScopeTTSConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_DASHSCOPE_BASE_URL.to_string(),
            model: DEFAULT_TTS_MODEL.to_string(),
            voice: DashScopeVoice::default(),
            language_type: DEFAULT_LANGUAGE_TYPE.to_string(),
            allow_private_audio_urls: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DashScopeTTSConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Full synthesis endpoint URL.
    pub fn api_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), DASHSCOPE_TTS_PATH)
    }

    /// Validate everything except the key (checked per call).
    pub fn validate(&self) -> Result<(), TTSError> {
        url::Url::parse(&self.base_url)
            .map_err(|e| TTSError::Configuration(format!("Invalid base_url: {e}")))?;
        if self.model.trim().is_empty() {
            return Err(TTSError::Configuration("model must not be empty".into()));
        }
        if self.language_type.trim().is_empty() {
            return Err(TTSError::Configuration(
                "language_type must not be empty".into(),
            ));
        }
        Ok(())
    }
}
