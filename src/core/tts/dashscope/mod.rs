//! DashScope (Alibaba Cloud Model Studio) text-to-speech.

mod config;
mod messages;
mod provider;

pub use config::{
    DASHSCOPE_TTS_PATH, DEFAULT_DASHSCOPE_BASE_URL, DEFAULT_LANGUAGE_TYPE, DEFAULT_TTS_MODEL,
    DashScopeTTSConfig, DashScopeVoice,
};
pub use messages::{AudioSource, SynthesisResponse};
pub use provider::DashScopeTTS;
