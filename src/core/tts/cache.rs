//! In-memory audio cache in front of a synthesizer.
//!
//! Replies often repeat short sentences ("好的！", "Sure."); caching the audio by
//! a hash of the synthesizer settings, emotion and text skips the round trip.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_128;

use super::base::{AudioData, BoxedSynthesizer, SpeechSynthesizer, TTSResult};
use crate::core::emotion::EmotionTag;

/// Default number of cached utterances.
pub const DEFAULT_CACHE_CAPACITY: u64 = 256;

/// Wraps a synthesizer with an LRU-ish audio cache. Failures are never cached.
pub struct CachedSynthesizer {
    inner: BoxedSynthesizer,
    cache: Cache<String, AudioData>,
}

impl CachedSynthesizer {
    pub fn new(inner: BoxedSynthesizer, capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(capacity),
        }
    }

    pub fn into_boxed(self) -> BoxedSynthesizer {
        Arc::new(self)
    }

    fn cache_key(&self, text: &str, emotion: &EmotionTag) -> String {
        let mut s = self.inner.config_hash();
        s.push('|');
        s.push_str(emotion.as_str());
        s.push('|');
        s.push_str(text.trim());
        let hash = xxh3_128(s.as_bytes());
        format!("{hash:032x}")
    }

    /// Number of cached entries (approximate until pending tasks run).
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl SpeechSynthesizer for CachedSynthesizer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn check_ready(&self) -> TTSResult<()> {
        self.inner.check_ready()
    }

    fn config_hash(&self) -> String {
        self.inner.config_hash()
    }

    async fn synthesize(&self, text: &str, emotion: &EmotionTag) -> TTSResult<AudioData> {
        let key = self.cache_key(text, emotion);
        if let Some(audio) = self.cache.get(&key).await {
            debug!(provider = self.inner.name(), "TTS cache hit");
            return Ok(audio);
        }

        let audio = self.inner.synthesize(text, emotion).await?;
        self.cache.insert(key, audio.clone()).await;
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tts::base::TTSError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSynth {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl SpeechSynthesizer for CountingSynth {
        fn name(&self) -> &str {
            "counting"
        }
        fn check_ready(&self) -> TTSResult<()> {
            Ok(())
        }
        fn config_hash(&self) -> String {
            "cfg".into()
        }
        async fn synthesize(&self, text: &str, _emotion: &EmotionTag) -> TTSResult<AudioData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TTSError::NoAudio);
            }
            Ok(AudioData::from_bytes(text.as_bytes().to_vec()))
        }
    }

    fn counting(fail: bool) -> Arc<CountingSynth> {
        Arc::new(CountingSynth {
            calls: AtomicUsize::new(0),
            fail,
        })
    }

    #[tokio::test]
    async fn test_repeated_text_hits_cache() {
        let inner = counting(false);
        let cached = CachedSynthesizer::new(inner.clone(), 16);

        let a = cached.synthesize("好的！", &EmotionTag::Happy).await.unwrap();
        let b = cached.synthesize("好的！", &EmotionTag::Happy).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_emotion_is_part_of_key() {
        let inner = counting(false);
        let cached = CachedSynthesizer::new(inner.clone(), 16);

        cached.synthesize("好的！", &EmotionTag::Happy).await.unwrap();
        cached.synthesize("好的！", &EmotionTag::Sad).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failures_not_cached() {
        let inner = counting(true);
        let cached = CachedSynthesizer::new(inner.clone(), 16);

        assert!(cached.synthesize("x", &EmotionTag::Neutral).await.is_err());
        assert!(cached.synthesize("x", &EmotionTag::Neutral).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
