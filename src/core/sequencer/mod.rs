//! Speech Sequencer.
//!
//! Converts utterances into audio and plays them in submission order while
//! keeping synthesis requests at least `min_synthesis_interval` apart.
//!
//! | Failure | Handling |
//! |---------|----------|
//! | Synthesizer not ready (missing key) | `submit` returns [`SequencerError::InvalidCredential`] |
//! | Synthesis error | job resolves [`JobOutcome::NoAudio`], callbacks still fire |
//! | Playback error | job resolves [`JobOutcome::PlaybackFailed`], queue proceeds |
//! | `reset` / `dispose` | pending jobs resolve [`JobOutcome::Cancelled`] |

mod pipeline;
mod types;

#[cfg(test)]
mod tests;

pub use pipeline::SpeechSequencer;
pub use types::{
    DEFAULT_MIN_SYNTHESIS_INTERVAL, JobCallback, JobCallbacks, JobHandle, JobOutcome,
    SequencerConfig, SequencerError, SpeechJob,
};
