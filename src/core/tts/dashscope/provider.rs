//! DashScope (Qwen) TTS provider.
//!
//! # API Reference
//!
//! - Endpoint: `POST {base}/api/v1/services/aigc/multimodal-generation/generation`
//! - Auth: `Authorization: Bearer <key>`
//! - Models: qwen3-tts-flash
//! - Output: a short-lived audio URL or inline base64 audio

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use tracing::{debug, warn};
use xxhash_rust::xxh3::xxh3_128;

use super::config::DashScopeTTSConfig;
use super::messages::{AudioSource, DashScopeErrorResponse, SynthesisInput, SynthesisRequest, SynthesisResponse};
use crate::core::emotion::EmotionTag;
use crate::core::tts::base::{AudioData, SpeechSynthesizer, TTSError, TTSResult};
use crate::utils::url_validation::validate_audio_url;

const USER_AGENT: &str = concat!("voxchat/", env!("CARGO_PKG_VERSION"));

// =============================================================================
// Config Hash for Caching
// =============================================================================

/// Compute a hash of the settings that change the produced audio.
fn compute_tts_config_hash(config: &DashScopeTTSConfig) -> String {
    let mut s = String::new();
    s.push_str("dashscope");
    s.push('|');
    s.push_str(&config.model);
    s.push('|');
    s.push_str(config.voice.as_str());
    s.push('|');
    s.push_str(&config.language_type);
    let hash = xxh3_128(s.as_bytes());
    format!("{hash:032x}")
}

/// Decode inline audio, tolerating a `data:<mime>;base64,` prefix.
fn decode_inline_audio(data: &str) -> TTSResult<AudioData> {
    let payload = match data.split_once(";base64,") {
        Some((prefix, rest)) if prefix.starts_with("data:") => rest,
        _ => data,
    };
    let bytes = BASE64
        .decode(payload.trim())
        .map_err(|e| TTSError::Decode(e.to_string()))?;
    if bytes.is_empty() {
        return Err(TTSError::NoAudio);
    }
    Ok(AudioData::from_bytes(bytes))
}

// =============================================================================
// DashScope TTS Provider
// =============================================================================

/// DashScope TTS provider.
///
/// ```rust,ignore
/// use voxchat::core::tts::{DashScopeTTS, DashScopeTTSConfig, SpeechSynthesizer};
/// use voxchat::core::emotion::EmotionTag;
///
/// let tts = DashScopeTTS::new(DashScopeTTSConfig::new("sk-..."))?;
/// let audio = tts.synthesize("你好！", &EmotionTag::Happy).await?;
/// ```
pub struct DashScopeTTS {
    config: DashScopeTTSConfig,
    http_client: Client,
    config_hash: String,
}

impl DashScopeTTS {
    pub fn new(config: DashScopeTTSConfig) -> TTSResult<Self> {
        config.validate()?;
        let http_client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| TTSError::Configuration(format!("Failed to build HTTP client: {e}")))?;
        let config_hash = compute_tts_config_hash(&config);
        Ok(Self {
            config,
            http_client,
            config_hash,
        })
    }

    pub fn config(&self) -> &DashScopeTTSConfig {
        &self.config
    }

    async fn request_synthesis(&self, text: &str) -> TTSResult<SynthesisResponse> {
        let body = SynthesisRequest {
            model: &self.config.model,
            input: SynthesisInput {
                text,
                voice: self.config.voice.as_str(),
                language_type: &self.config.language_type,
            },
        };

        let response = self
            .http_client
            .post(self.config.api_url())
            .bearer_auth(self.config.api_key.trim())
            .json(&body)
            .send()
            .await
            .map_err(|e| TTSError::Network(e.to_string()))?;

        let status = response.status();
        let raw = response
            .text()
            .await
            .map_err(|e| TTSError::Network(e.to_string()))?;

        if !status.is_success() {
            let err: DashScopeErrorResponse = serde_json::from_str(&raw).unwrap_or_default();
            return Err(TTSError::Provider {
                code: err.code.unwrap_or_else(|| status.as_u16().to_string()),
                message: err.message.unwrap_or(raw),
            });
        }

        serde_json::from_str(&raw).map_err(|e| TTSError::Decode(format!("Invalid response: {e}")))
    }

    async fn fetch_audio(&self, url: &str) -> TTSResult<AudioData> {
        let url = validate_audio_url(url, self.config.allow_private_audio_urls)
            .await
            .map_err(|e| TTSError::UnsafeAudioUrl(e.to_string()))?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| TTSError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(TTSError::Network(format!(
                "Audio download failed with status {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TTSError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TTSError::NoAudio);
        }
        Ok(AudioData::from_bytes(bytes))
    }
}

#[async_trait]
impl SpeechSynthesizer for DashScopeTTS {
    fn name(&self) -> &str {
        "dashscope"
    }

    fn check_ready(&self) -> TTSResult<()> {
        if self.config.api_key.trim().is_empty() {
            return Err(TTSError::InvalidCredential);
        }
        Ok(())
    }

    fn config_hash(&self) -> String {
        self.config_hash.clone()
    }

    async fn synthesize(&self, text: &str, emotion: &EmotionTag) -> TTSResult<AudioData> {
        self.check_ready()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(TTSError::InvalidText("text must not be empty".into()));
        }

        debug!(
            voice = %self.config.voice,
            emotion = %emotion,
            chars = text.chars().count(),
            "Requesting DashScope synthesis"
        );

        let response = self.request_synthesis(text).await?;
        match response.audio_source() {
            Some(AudioSource::Url(url)) => self.fetch_audio(&url).await,
            Some(AudioSource::Inline(data)) => decode_inline_audio(&data),
            None => {
                warn!(request_id = ?response.request_id, "DashScope response carried no audio");
                Err(TTSError::NoAudio)
            }
        }
    }
}
