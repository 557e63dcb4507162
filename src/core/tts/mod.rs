//! Speech synthesis boundary.
//!
//! The sequencer only sees [`SpeechSynthesizer`]; [`DashScopeTTS`] is the
//! production implementation and [`CachedSynthesizer`] can wrap any of them.

mod base;
pub mod cache;
pub mod dashscope;

pub use base::{AudioData, BoxedSynthesizer, SpeechSynthesizer, TTSError, TTSResult, sniff_format};
pub use cache::{CachedSynthesizer, DEFAULT_CACHE_CAPACITY};
pub use dashscope::{DashScopeTTS, DashScopeTTSConfig, DashScopeVoice};

/// Build the configured synthesizer, wrapped in a cache when `cache_capacity > 0`.
pub fn create_synthesizer(
    config: DashScopeTTSConfig,
    cache_capacity: u64,
) -> TTSResult<BoxedSynthesizer> {
    let provider: BoxedSynthesizer = std::sync::Arc::new(DashScopeTTS::new(config)?);
    if cache_capacity == 0 {
        return Ok(provider);
    }
    Ok(CachedSynthesizer::new(provider, cache_capacity).into_boxed())
}
