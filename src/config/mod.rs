//! Configuration module for voxchat
//!
//! Configuration comes from .env files, environment variables and an optional
//! YAML file. Priority: YAML > ENV vars > .env values > defaults.
//!
//! # Modules
//! - `yaml`: YAML configuration file loading
//! - `env`: Environment variable loading
//!
//! # Example
//! ```rust,no_run
//! use voxchat::config::AppConfig;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = AppConfig::from_env()?;
//!
//! // Load from YAML file with environment variable overrides
//! let config_path = PathBuf::from("voxchat.yaml");
//! let config = AppConfig::from_file(&config_path)?;
//!
//! println!("Chatting with {}", config.chat_model);
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::chat::{
    ChatConfig, DEFAULT_BACKOFF_BASE_MS, DEFAULT_CHAT_API_URL, DEFAULT_CHAT_MODEL,
    DEFAULT_MAX_RETRIES, DEFAULT_MAX_TOKENS, RetryPolicy,
};
use crate::core::conversation::PromptLanguage;
use crate::core::segmenter::{DEFAULT_COMMA_THRESHOLD, SegmenterConfig};
use crate::core::sequencer::SequencerConfig;
use crate::core::tts::dashscope::{
    DEFAULT_DASHSCOPE_BASE_URL, DEFAULT_LANGUAGE_TYPE, DEFAULT_TTS_MODEL, DashScopeTTSConfig,
    DashScopeVoice,
};
use crate::core::tts::DEFAULT_CACHE_CAPACITY;

mod env;
mod yaml;

pub use yaml::YamlConfig;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration
///
/// Contains everything needed to run a voice chat session:
/// - Chat transport (endpoint, model, key, retry policy)
/// - DashScope synthesis (key, model, voice, cache)
/// - Speech pacing and segmentation
/// - Session persistence
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Chat transport
    pub chat_api_url: String,
    pub chat_model: String,
    pub chat_api_key: Option<String>,
    pub chat_max_tokens: u32,
    /// Retries after the first request on 429 or network failure
    pub chat_max_retries: u32,
    pub chat_backoff_base_ms: u64,

    // Speech synthesis
    pub dashscope_api_key: Option<String>,
    pub dashscope_base_url: String,
    pub tts_model: String,
    pub tts_voice: String,
    pub tts_language: String,
    /// 0 disables the audio cache
    pub tts_cache_capacity: u64,
    pub allow_private_audio_urls: bool,

    // Speech pacing
    pub min_synthesis_interval_ms: u64,
    pub comma_threshold: usize,
    pub prompt_language: String,

    // Session persistence
    pub session_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            chat_api_url: DEFAULT_CHAT_API_URL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            chat_api_key: None,
            chat_max_tokens: DEFAULT_MAX_TOKENS,
            chat_max_retries: DEFAULT_MAX_RETRIES,
            chat_backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            dashscope_api_key: None,
            dashscope_base_url: DEFAULT_DASHSCOPE_BASE_URL.to_string(),
            tts_model: DEFAULT_TTS_MODEL.to_string(),
            tts_voice: DashScopeVoice::default().as_str().to_string(),
            tts_language: DEFAULT_LANGUAGE_TYPE.to_string(),
            tts_cache_capacity: DEFAULT_CACHE_CAPACITY,
            allow_private_audio_urls: false,
            min_synthesis_interval_ms: 1000,
            comma_threshold: DEFAULT_COMMA_THRESHOLD,
            prompt_language: PromptLanguage::default().as_str().to_string(),
            session_path: None,
        }
    }
}

/// Implement Drop to zeroize the API keys when AppConfig is dropped.
impl Drop for AppConfig {
    fn drop(&mut self) {
        use zeroize::Zeroize;

        if let Some(ref mut key) = self.chat_api_key {
            key.zeroize();
        }
        if let Some(ref mut key) = self.dashscope_api_key {
            key.zeroize();
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables over defaults.
    ///
    /// The .env file is loaded into the environment in `main` before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        env::apply_env(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file with environment variable base
    ///
    /// Priority order (highest to lowest):
    /// 1. YAML file values
    /// 2. Environment variables (actual ENV vars override .env values)
    /// 3. .env file values
    /// 4. Default values
    ///
    /// # Errors
    /// Returns an error if:
    /// - The YAML file cannot be read or is malformed
    /// - Environment variables have invalid formats
    /// - Configuration validation fails
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let yaml_config = YamlConfig::from_file(path)?;

        let mut config = Self::default();
        env::apply_env(&mut config)?;
        config.apply_yaml(yaml_config);
        config.validate()?;
        Ok(config)
    }

    fn apply_yaml(&mut self, yaml: YamlConfig) {
        if let Some(chat) = yaml.chat {
            if let Some(v) = chat.api_url {
                self.chat_api_url = v;
            }
            if let Some(v) = chat.model {
                self.chat_model = v;
            }
            if let Some(v) = chat.api_key.filter(|k| !k.trim().is_empty()) {
                self.chat_api_key = Some(v);
            }
            if let Some(v) = chat.max_tokens {
                self.chat_max_tokens = v;
            }
            if let Some(v) = chat.max_retries {
                self.chat_max_retries = v;
            }
            if let Some(v) = chat.backoff_base_ms {
                self.chat_backoff_base_ms = v;
            }
        }

        if let Some(tts) = yaml.tts {
            if let Some(v) = tts.api_key.filter(|k| !k.trim().is_empty()) {
                self.dashscope_api_key = Some(v);
            }
            if let Some(v) = tts.base_url {
                self.dashscope_base_url = v;
            }
            if let Some(v) = tts.model {
                self.tts_model = v;
            }
            if let Some(v) = tts.voice {
                self.tts_voice = v;
            }
            if let Some(v) = tts.language {
                self.tts_language = v;
            }
            if let Some(v) = tts.cache_capacity {
                self.tts_cache_capacity = v;
            }
            if let Some(v) = tts.allow_private_audio_urls {
                self.allow_private_audio_urls = v;
            }
        }

        if let Some(speech) = yaml.speech {
            if let Some(v) = speech.min_synthesis_interval_ms {
                self.min_synthesis_interval_ms = v;
            }
            if let Some(v) = speech.comma_threshold {
                self.comma_threshold = v;
            }
            if let Some(v) = speech.prompt_language {
                self.prompt_language = v;
            }
        }

        if let Some(path) = yaml.session.and_then(|s| s.path) {
            self.session_path = Some(PathBuf::from(path));
        }
    }

    /// Check cross-field constraints. Missing API keys are not errors here;
    /// they surface as `InvalidCredential` when used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("chat_api_url", &self.chat_api_url),
            ("dashscope_base_url", &self.dashscope_base_url),
        ] {
            let url = url::Url::parse(value)
                .map_err(|e| ConfigError::Invalid(format!("{name} '{value}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }

        if self.chat_max_tokens == 0 {
            return Err(ConfigError::Invalid(
                "chat_max_tokens must be greater than zero".into(),
            ));
        }
        if self.comma_threshold == 0 {
            return Err(ConfigError::Invalid(
                "comma_threshold must be greater than zero".into(),
            ));
        }
        if !DashScopeVoice::all()
            .iter()
            .any(|v| v.as_str().eq_ignore_ascii_case(self.tts_voice.trim()))
        {
            let known: Vec<&str> = DashScopeVoice::all().iter().map(|v| v.as_str()).collect();
            return Err(ConfigError::Invalid(format!(
                "Unknown TTS voice '{}'. Supported: {}",
                self.tts_voice,
                known.join(", ")
            )));
        }
        Ok(())
    }

    // =========================================================================
    // Component settings
    // =========================================================================

    pub fn chat_config(&self) -> ChatConfig {
        ChatConfig {
            api_url: self.chat_api_url.clone(),
            model: self.chat_model.clone(),
            max_tokens: Some(self.chat_max_tokens),
            retry: RetryPolicy {
                max_retries: self.chat_max_retries,
                backoff_base_ms: self.chat_backoff_base_ms,
            },
            ..Default::default()
        }
    }

    pub fn tts_config(&self) -> DashScopeTTSConfig {
        DashScopeTTSConfig {
            api_key: self.dashscope_api_key.clone().unwrap_or_default(),
            base_url: self.dashscope_base_url.clone(),
            model: self.tts_model.clone(),
            voice: DashScopeVoice::from_str_or_default(self.tts_voice.trim()),
            language_type: self.tts_language.clone(),
            allow_private_audio_urls: self.allow_private_audio_urls,
            ..Default::default()
        }
    }

    pub fn sequencer_config(&self) -> SequencerConfig {
        SequencerConfig {
            min_synthesis_interval: Duration::from_millis(self.min_synthesis_interval_ms),
        }
    }

    pub fn segmenter_config(&self) -> SegmenterConfig {
        SegmenterConfig {
            comma_threshold: self.comma_threshold,
        }
    }

    pub fn prompt_language(&self) -> PromptLanguage {
        PromptLanguage::from_str_or_default(&self.prompt_language)
    }

    /// Chat API key, or an empty string (rejected by the transport).
    pub fn chat_api_key(&self) -> String {
        self.chat_api_key.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "CHAT_API_URL",
        "CHAT_MODEL",
        "CHAT_API_KEY",
        "CHAT_MAX_TOKENS",
        "CHAT_MAX_RETRIES",
        "CHAT_BACKOFF_BASE_MS",
        "DASHSCOPE_API_KEY",
        "DASHSCOPE_BASE_URL",
        "TTS_MODEL",
        "TTS_VOICE",
        "TTS_LANGUAGE",
        "TTS_CACHE_CAPACITY",
        "ALLOW_PRIVATE_AUDIO_URLS",
        "MIN_SYNTHESIS_INTERVAL_MS",
        "SEGMENT_COMMA_THRESHOLD",
        "PROMPT_LANGUAGE",
        "SESSION_PATH",
    ];

    fn cleanup_env_vars() {
        unsafe {
            for name in ENV_VARS {
                env::remove_var(name);
            }
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chat_max_retries, 3);
        assert_eq!(config.chat_config().retry.max_attempts(), 4);
        assert_eq!(
            config.sequencer_config().min_synthesis_interval,
            Duration::from_millis(1000)
        );
        assert_eq!(config.prompt_language(), PromptLanguage::Zh);
        assert_eq!(config.tts_config().voice, DashScopeVoice::Cherry);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        cleanup_env_vars();

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.chat_model, DEFAULT_CHAT_MODEL);
        assert!(config.chat_api_key.is_none());
        assert_eq!(config.chat_api_key(), "");
        assert!(config.dashscope_api_key.is_none());
        assert_eq!(config.tts_cache_capacity, 256);
        assert!(config.session_path.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_values() {
        cleanup_env_vars();
        unsafe {
            env::set_var("CHAT_API_KEY", "env-chat-key");
            env::set_var("CHAT_MAX_RETRIES", "5");
            env::set_var("DASHSCOPE_API_KEY", "env-tts-key");
            env::set_var("TTS_VOICE", "yunyang");
            env::set_var("ALLOW_PRIVATE_AUDIO_URLS", "yes");
            env::set_var("MIN_SYNTHESIS_INTERVAL_MS", "250");
            env::set_var("PROMPT_LANGUAGE", "en");
            env::set_var("SESSION_PATH", "/tmp/voxchat.json");
        }

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.chat_api_key, Some("env-chat-key".to_string()));
        assert_eq!(config.chat_config().retry.max_retries, 5);
        assert_eq!(config.tts_config().api_key, "env-tts-key");
        assert_eq!(config.tts_config().voice, DashScopeVoice::Yunyang);
        assert!(config.tts_config().allow_private_audio_urls);
        assert_eq!(
            config.sequencer_config().min_synthesis_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.prompt_language(), PromptLanguage::En);
        assert_eq!(config.session_path, Some(PathBuf::from("/tmp/voxchat.json")));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_empty_key_is_unset() {
        cleanup_env_vars();
        unsafe {
            env::set_var("CHAT_API_KEY", "   ");
        }

        let config = AppConfig::from_env().unwrap();
        assert!(config.chat_api_key.is_none());

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_malformed_number() {
        cleanup_env_vars();
        unsafe {
            env::set_var("MIN_SYNTHESIS_INTERVAL_MS", "soon");
        }

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("MIN_SYNTHESIS_INTERVAL_MS"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_malformed_bool() {
        cleanup_env_vars();
        unsafe {
            env::set_var("ALLOW_PRIVATE_AUDIO_URLS", "maybe");
        }

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("ALLOW_PRIVATE_AUDIO_URLS"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_env_unknown_voice() {
        cleanup_env_vars();
        unsafe {
            env::set_var("TTS_VOICE", "Darth");
        }

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("Unknown TTS voice"));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_yaml_overrides_env() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("voxchat.yaml");
        let yaml_content = r#"
chat:
  model: "glm-4-flash"
  api_key: "yaml-chat-key"

speech:
  comma_threshold: 15
"#;
        fs::write(&config_path, yaml_content).unwrap();

        unsafe {
            env::set_var("CHAT_MODEL", "env-model");
            env::set_var("CHAT_API_KEY", "env-chat-key");
            env::set_var("DASHSCOPE_API_KEY", "env-tts-key");
        }

        let config = AppConfig::from_file(&config_path).unwrap();

        // YAML overrides ENV
        assert_eq!(config.chat_model, "glm-4-flash");
        assert_eq!(config.chat_api_key, Some("yaml-chat-key".to_string()));
        // ENV value where YAML is silent
        assert_eq!(config.dashscope_api_key, Some("env-tts-key".to_string()));
        assert_eq!(config.segmenter_config().comma_threshold, 15);

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_missing_file() {
        cleanup_env_vars();

        let result = AppConfig::from_file(&PathBuf::from("/nonexistent/voxchat.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_invalid_yaml() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.yaml");
        fs::write(&config_path, "invalid: yaml: [content").unwrap();

        let result = AppConfig::from_file(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));

        cleanup_env_vars();
    }

    #[test]
    #[serial]
    fn test_from_file_rejects_bad_url() {
        cleanup_env_vars();

        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("voxchat.yaml");
        fs::write(&config_path, "chat:\n  api_url: \"ftp://example.com\"\n").unwrap();

        let err = AppConfig::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("http or https"));

        cleanup_env_vars();
    }
}
