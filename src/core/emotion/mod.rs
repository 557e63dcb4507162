//! Emotion tags carried by utterances.
//!
//! Replies arrive as `[tag]sentence` pairs. The tag is parsed into an
//! [`EmotionTag`] by the segmenter and handed, together with the synthesized
//! audio, to the playback sink (e.g. an avatar that switches expression).
//!
//! ```text
//! "[happy]Hello!"  ──▶  Segmenter  ──▶  Utterance { Happy, "Hello!" }
//!                                            │
//!                                            ▼
//!                               PlaybackSink::play(audio, Happy)
//! ```

pub mod types;

pub use types::{EmotionTag, MAX_TAG_LEN, ProsodyHint};
