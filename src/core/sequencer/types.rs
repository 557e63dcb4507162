use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, watch};

use crate::core::segmenter::Utterance;
use crate::core::tts::TTSError;

/// Default minimum spacing between two synthesis calls.
pub const DEFAULT_MIN_SYNTHESIS_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerConfig {
    /// Measured from the moment the previous synthesis call returned.
    pub min_synthesis_interval: Duration,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            min_synthesis_interval: DEFAULT_MIN_SYNTHESIS_INTERVAL,
        }
    }
}

/// One utterance scheduled for synthesis and playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechJob {
    pub utterance: Utterance,
    /// Monotonically increasing per sequencer, assigned at submission.
    pub sequence_index: u64,
}

/// Callback invoked with the job it belongs to.
pub type JobCallback = Box<dyn FnOnce(&SpeechJob) + Send + 'static>;

/// Per-job hooks fired by the playback worker.
///
/// `on_start` fires when the job reaches the head of the playback queue,
/// `on_complete` after playback ended (or was skipped for lack of audio).
#[derive(Default)]
pub struct JobCallbacks {
    pub on_start: Option<JobCallback>,
    pub on_complete: Option<JobCallback>,
}

impl JobCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_start(mut self, f: impl FnOnce(&SpeechJob) + Send + 'static) -> Self {
        self.on_start = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(&SpeechJob) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for JobCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobCallbacks")
            .field("on_start", &self.on_start.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .finish()
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// Audio was handed to the sink and playback ended.
    Played,
    /// Synthesis failed; the job was skipped.
    NoAudio,
    /// The sink reported an error; treated as ended.
    PlaybackFailed,
    /// The sequencer was reset or disposed before the job finished.
    Cancelled,
}

/// Handle to a submitted job.
#[derive(Debug)]
pub struct JobHandle {
    pub(crate) sequence_index: u64,
    pub(crate) rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    /// Wait for the job to finish.
    pub async fn outcome(self) -> JobOutcome {
        self.rx.await.unwrap_or(JobOutcome::Cancelled)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SequencerError {
    #[error("Synthesizer is not ready: {0}")]
    InvalidCredential(TTSError),

    #[error("Sequencer has been disposed")]
    Disposed,
}

// =============================================================================
// Internal queue items
// =============================================================================

/// Decrements the pending-job counter when the job leaves the pipeline,
/// whether it finished or was dropped by a reset.
pub(crate) struct PendingGuard(pub(crate) Arc<watch::Sender<usize>>);

impl PendingGuard {
    pub(crate) fn acquire(counter: &Arc<watch::Sender<usize>>) -> Self {
        counter.send_modify(|n| *n += 1);
        Self(counter.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

pub(crate) struct QueuedJob {
    pub(crate) job: SpeechJob,
    pub(crate) callbacks: JobCallbacks,
    pub(crate) done: oneshot::Sender<JobOutcome>,
    pub(crate) _pending: PendingGuard,
}

impl QueuedJob {
    pub(crate) fn finish(self, outcome: JobOutcome) {
        let _ = self.done.send(outcome);
    }
}
