use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::types::{
    JobCallbacks, JobHandle, JobOutcome, PendingGuard, QueuedJob, SequencerConfig,
    SequencerError, SpeechJob,
};
use crate::core::segmenter::Utterance;
use crate::core::tts::{AudioData, BoxedSynthesizer};
use crate::playback::BoxedSink;

/// A job whose synthesis step has finished.
struct Synthesized {
    queued: QueuedJob,
    audio: Option<AudioData>,
}

/// Live worker pair; replaced on reset, dropped on dispose.
struct Workers {
    tx: mpsc::UnboundedSender<QueuedJob>,
    cancel: CancellationToken,
}

/// Turns utterances into audio and plays it in submission order.
///
/// Two worker tasks are joined by a FIFO queue. The synthesis worker pulls
/// one job at a time, waits out the minimum interval since the previous
/// synthesis returned, and forwards the result. The playback worker takes
/// results strictly in order and waits for the sink before the next one.
/// Synthesis calls therefore never overlap, and playback order never depends
/// on synthesis latency.
///
/// One sequencer belongs to one speech session. Must be created inside a
/// tokio runtime.
pub struct SpeechSequencer {
    session_id: String,
    synthesizer: BoxedSynthesizer,
    sink: BoxedSink,
    config: SequencerConfig,
    workers: Mutex<Option<Workers>>,
    next_index: AtomicU64,
    pending: Arc<watch::Sender<usize>>,
}

impl SpeechSequencer {
    pub fn new(synthesizer: BoxedSynthesizer, sink: BoxedSink, config: SequencerConfig) -> Self {
        let session_id = Uuid::new_v4().to_string();
        let (pending, _) = watch::channel(0usize);
        let sequencer = Self {
            session_id,
            synthesizer,
            sink,
            config,
            workers: Mutex::new(None),
            next_index: AtomicU64::new(0),
            pending: Arc::new(pending),
        };
        *sequencer.workers.lock() = Some(sequencer.spawn_workers());
        info!(
            session_id = %sequencer.session_id,
            provider = sequencer.synthesizer.name(),
            min_interval_ms = sequencer.config.min_synthesis_interval.as_millis() as u64,
            "Speech sequencer started"
        );
        sequencer
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &SequencerConfig {
        &self.config
    }

    /// Number of jobs submitted but not yet finished.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }

    pub fn is_disposed(&self) -> bool {
        self.workers.lock().is_none()
    }

    /// Schedule an utterance.
    ///
    /// Fails immediately, without touching either queue, when the synthesizer
    /// is not ready (e.g. missing key) or the sequencer was disposed.
    pub fn submit(
        &self,
        utterance: Utterance,
        callbacks: JobCallbacks,
    ) -> Result<JobHandle, SequencerError> {
        self.synthesizer
            .check_ready()
            .map_err(SequencerError::InvalidCredential)?;

        let guard = self.workers.lock();
        let workers = guard.as_ref().ok_or(SequencerError::Disposed)?;

        let sequence_index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let (done, rx) = oneshot::channel();
        let queued = QueuedJob {
            job: SpeechJob {
                utterance,
                sequence_index,
            },
            callbacks,
            done,
            _pending: PendingGuard::acquire(&self.pending),
        };

        debug!(
            session_id = %self.session_id,
            sequence_index,
            emotion = %queued.job.utterance.emotion,
            "Submitting speech job"
        );

        // Workers only exit after their token is cancelled, and a cancelled
        // pair is never left in `workers`; a failed send just drops the job.
        if workers.tx.send(queued).is_err() {
            warn!(sequence_index, "Speech workers are gone, job dropped");
        }

        Ok(JobHandle { sequence_index, rx })
    }

    /// Submit several utterances in order.
    pub fn submit_all(
        &self,
        utterances: impl IntoIterator<Item = Utterance>,
    ) -> Result<Vec<JobHandle>, SequencerError> {
        utterances
            .into_iter()
            .map(|u| self.submit(u, JobCallbacks::default()))
            .collect()
    }

    /// Wait until every submitted job has finished or been cancelled.
    pub async fn idle(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Cancel queued and in-flight jobs and start over with fresh queues.
    ///
    /// Cancelled handles resolve to [`JobOutcome::Cancelled`] and their
    /// callbacks are not invoked. Sequence indices keep increasing.
    pub fn reset(&self) {
        let mut workers = self.workers.lock();
        let Some(old) = workers.take() else {
            return;
        };
        old.cancel.cancel();
        *workers = Some(self.spawn_workers());
        info!(session_id = %self.session_id, "Speech sequencer reset");
    }

    /// Cancel everything and refuse further submissions.
    pub fn dispose(&self) {
        if let Some(old) = self.workers.lock().take() {
            old.cancel.cancel();
            info!(session_id = %self.session_id, "Speech sequencer disposed");
        }
    }

    fn spawn_workers(&self) -> Workers {
        let cancel = CancellationToken::new();
        let (tx, job_rx) = mpsc::unbounded_channel();
        let (synth_tx, synth_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_synthesis_worker(
            self.synthesizer.clone(),
            self.config.clone(),
            job_rx,
            synth_tx,
            cancel.clone(),
        ));
        tokio::spawn(run_playback_worker(
            self.sink.clone(),
            synth_rx,
            cancel.clone(),
        ));

        Workers { tx, cancel }
    }
}

impl Drop for SpeechSequencer {
    fn drop(&mut self) {
        if let Some(workers) = self.workers.get_mut().take() {
            workers.cancel.cancel();
        }
    }
}

// =============================================================================
// Workers
// =============================================================================

async fn run_synthesis_worker(
    synthesizer: BoxedSynthesizer,
    config: SequencerConfig,
    mut rx: mpsc::UnboundedReceiver<QueuedJob>,
    tx: mpsc::UnboundedSender<Synthesized>,
    cancel: CancellationToken,
) {
    let mut last_returned: Option<Instant> = None;

    loop {
        let queued = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let sequence_index = queued.job.sequence_index;
        if let Some(last) = last_returned {
            let ready_at = last + config.min_synthesis_interval;
            let now = Instant::now();
            if ready_at > now {
                debug!(
                    sequence_index,
                    wait_ms = (ready_at - now).as_millis() as u64,
                    "Throttling synthesis"
                );
            }
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = sleep_until(ready_at) => {}
            }
        }

        let utterance = &queued.job.utterance;
        let started = Instant::now();
        debug!(sequence_index, emotion = %utterance.emotion, "Synthesis started");
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            result = synthesizer.synthesize(&utterance.text, &utterance.emotion) => result,
        };
        last_returned = Some(Instant::now());
        debug!(
            sequence_index,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Synthesis finished"
        );

        let audio = match result {
            Ok(audio) => Some(audio),
            Err(e) => {
                warn!(
                    sequence_index = queued.job.sequence_index,
                    error = %e,
                    "Synthesis failed, utterance will be skipped"
                );
                None
            }
        };

        if tx.send(Synthesized { queued, audio }).is_err() {
            break;
        }
    }

    rx.close();
    while rx.try_recv().is_ok() {}
}

async fn run_playback_worker(
    sink: BoxedSink,
    mut rx: mpsc::UnboundedReceiver<Synthesized>,
    cancel: CancellationToken,
) {
    loop {
        let Synthesized { mut queued, audio } = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        if let Some(on_start) = queued.callbacks.on_start.take() {
            on_start(&queued.job);
        }

        let outcome = match audio {
            Some(audio) => {
                let emotion = &queued.job.utterance.emotion;
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    result = sink.play(&audio, emotion) => match result {
                        Ok(()) => JobOutcome::Played,
                        Err(e) => {
                            warn!(
                                sequence_index = queued.job.sequence_index,
                                error = %e,
                                "Playback failed, continuing"
                            );
                            JobOutcome::PlaybackFailed
                        }
                    },
                }
            }
            None => JobOutcome::NoAudio,
        };

        if let Some(on_complete) = queued.callbacks.on_complete.take() {
            on_complete(&queued.job);
        }
        queued.finish(outcome);
    }

    rx.close();
    while rx.try_recv().is_ok() {}
}
