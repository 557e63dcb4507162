//! Playback sinks.
//!
//! The sequencer hands each synthesized utterance to a [`PlaybackSink`] and
//! waits for `play` to return before starting the next one. Device output
//! (an avatar, a speaker) lives behind this trait; the CLI ships two sinks:
//!
//! - [`FileSink`] writes every payload to `<dir>/<seq>-<emotion>.<ext>`
//! - [`LogSink`] logs the payload and optionally sleeps for its estimated duration

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::core::emotion::EmotionTag;
use crate::core::tts::AudioData;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Playback I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Playback device error: {0}")]
    Device(String),
}

/// Receives audio in playback order. `play` returns once playback has ended.
#[async_trait]
pub trait PlaybackSink: Send + Sync {
    async fn play(&self, audio: &AudioData, emotion: &EmotionTag) -> Result<(), PlaybackError>;
}

pub type BoxedSink = Arc<dyn PlaybackSink>;

/// Rough playback length of an encoded payload.
///
/// WAV is assumed to be 24 kHz mono 16-bit (DashScope's output); compressed
/// formats are assumed to be 128 kbit/s.
pub fn estimate_duration(audio: &AudioData) -> Duration {
    let bytes_per_sec = match audio.format.as_str() {
        "wav" => 48_000,
        _ => 16_000,
    };
    Duration::from_millis(audio.len() as u64 * 1000 / bytes_per_sec)
}

/// Writes each payload to a numbered file.
pub struct FileSink {
    dir: PathBuf,
    counter: AtomicU64,
}

impl FileSink {
    /// Create the sink, creating `dir` if needed.
    pub async fn new(dir: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl PlaybackSink for FileSink {
    async fn play(&self, audio: &AudioData, emotion: &EmotionTag) -> Result<(), PlaybackError> {
        let seq = self.counter.fetch_add(1, Ordering::SeqCst);
        let path = self
            .dir
            .join(format!("{seq:04}-{}.{}", emotion.as_str(), audio.format));
        tokio::fs::write(&path, &audio.data).await?;
        info!(path = %path.display(), bytes = audio.len(), "Wrote utterance audio");
        Ok(())
    }
}

/// Logs each payload instead of playing it.
#[derive(Debug, Default)]
pub struct LogSink {
    simulate_duration: bool,
}

impl LogSink {
    pub fn new(simulate_duration: bool) -> Self {
        Self { simulate_duration }
    }
}

#[async_trait]
impl PlaybackSink for LogSink {
    async fn play(&self, audio: &AudioData, emotion: &EmotionTag) -> Result<(), PlaybackError> {
        let duration = estimate_duration(audio);
        info!(
            emotion = %emotion,
            format = %audio.format,
            bytes = audio.len(),
            duration_ms = duration.as_millis() as u64,
            "Playing utterance"
        );
        if self.simulate_duration {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}
