//! Environment variable loading.
//!
//! Empty values count as unset. Malformed numbers and booleans are errors
//! naming the variable rather than silent fallbacks.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use super::{AppConfig, ConfigError};

pub(super) fn env_string(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(super) fn env_parse<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env_string(name)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| ConfigError::Invalid(format!("{name}={raw}: {e}")))
        })
        .transpose()
}

pub(super) fn env_bool(name: &str) -> Result<Option<bool>, ConfigError> {
    env_string(name)
        .map(|raw| match raw.to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(format!(
                "{name}={raw}: expected true or false"
            ))),
        })
        .transpose()
}

/// Overlay environment variables onto `config`.
pub(super) fn apply_env(config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(v) = env_string("CHAT_API_URL") {
        config.chat_api_url = v;
    }
    if let Some(v) = env_string("CHAT_MODEL") {
        config.chat_model = v;
    }
    if let Some(v) = env_string("CHAT_API_KEY") {
        config.chat_api_key = Some(v);
    }
    if let Some(v) = env_parse("CHAT_MAX_TOKENS")? {
        config.chat_max_tokens = v;
    }
    if let Some(v) = env_parse("CHAT_MAX_RETRIES")? {
        config.chat_max_retries = v;
    }
    if let Some(v) = env_parse("CHAT_BACKOFF_BASE_MS")? {
        config.chat_backoff_base_ms = v;
    }

    if let Some(v) = env_string("DASHSCOPE_API_KEY") {
        config.dashscope_api_key = Some(v);
    }
    if let Some(v) = env_string("DASHSCOPE_BASE_URL") {
        config.dashscope_base_url = v;
    }
    if let Some(v) = env_string("TTS_MODEL") {
        config.tts_model = v;
    }
    if let Some(v) = env_string("TTS_VOICE") {
        config.tts_voice = v;
    }
    if let Some(v) = env_string("TTS_LANGUAGE") {
        config.tts_language = v;
    }
    if let Some(v) = env_parse("TTS_CACHE_CAPACITY")? {
        config.tts_cache_capacity = v;
    }
    if let Some(v) = env_bool("ALLOW_PRIVATE_AUDIO_URLS")? {
        config.allow_private_audio_urls = v;
    }

    if let Some(v) = env_parse("MIN_SYNTHESIS_INTERVAL_MS")? {
        config.min_synthesis_interval_ms = v;
    }
    if let Some(v) = env_parse("SEGMENT_COMMA_THRESHOLD")? {
        config.comma_threshold = v;
    }
    if let Some(v) = env_string("PROMPT_LANGUAGE") {
        config.prompt_language = v;
    }
    if let Some(v) = env_string("SESSION_PATH") {
        config.session_path = Some(PathBuf::from(v));
    }

    Ok(())
}
