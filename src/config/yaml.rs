use serde::Deserialize;
use std::path::PathBuf;

use super::ConfigError;

/// Complete YAML configuration structure
///
/// All fields are optional to allow partial configuration; anything left
/// out falls back to the environment and then to built-in defaults.
///
/// # Example YAML structure
/// ```yaml
/// chat:
///   api_url: "https://open.bigmodel.cn/api/paas/v4/chat/completions"
///   model: "glm-4.5-air"
///   api_key: "your-chat-key"
///   max_tokens: 200
///   max_retries: 3
///   backoff_base_ms: 2000
///
/// tts:
///   api_key: "your-dashscope-key"
///   base_url: "https://dashscope.aliyuncs.com"
///   model: "qwen3-tts-flash"
///   voice: "Cherry"
///   language: "Chinese"
///   cache_capacity: 256
///   allow_private_audio_urls: false
///
/// speech:
///   min_synthesis_interval_ms: 1000
///   comma_threshold: 10
///   prompt_language: "zh"
///
/// session:
///   path: "~/.voxchat/session.json"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub chat: Option<ChatYaml>,
    pub tts: Option<TtsYaml>,
    pub speech: Option<SpeechYaml>,
    pub session: Option<SessionYaml>,
}

/// Chat transport settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ChatYaml {
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub max_retries: Option<u32>,
    pub backoff_base_ms: Option<u64>,
}

/// Speech synthesis settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TtsYaml {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub language: Option<String>,
    /// Number of cached utterances; 0 disables the cache
    pub cache_capacity: Option<u64>,
    /// Development only: allow audio downloads from private addresses
    pub allow_private_audio_urls: Option<bool>,
}

/// Segmenter and sequencer settings from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SpeechYaml {
    pub min_synthesis_interval_ms: Option<u64>,
    pub comma_threshold: Option<usize>,
    pub prompt_language: Option<String>,
}

/// Session persistence from YAML
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SessionYaml {
    pub path: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    /// Returns an error if:
    /// - The file cannot be read
    /// - The YAML is malformed or fields have invalid types
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;

        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
