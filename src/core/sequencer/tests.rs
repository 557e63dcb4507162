use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::*;
use crate::core::emotion::EmotionTag;
use crate::core::segmenter::Utterance;
use crate::core::tts::{AudioData, SpeechSynthesizer, TTSError, TTSResult};
use crate::playback::{PlaybackError, PlaybackSink};

// =============================================================================
// Fakes
// =============================================================================

#[derive(Default)]
struct FakeSynth {
    /// Per-text latency; unlisted texts return immediately.
    latency: HashMap<String, Duration>,
    /// Texts that fail to synthesize.
    failing: Vec<String>,
    no_key: bool,
    calls: Mutex<Vec<(String, Instant, Instant)>>,
}

impl FakeSynth {
    fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynth {
    fn name(&self) -> &str {
        "fake"
    }

    fn check_ready(&self) -> TTSResult<()> {
        if self.no_key {
            return Err(TTSError::InvalidCredential);
        }
        Ok(())
    }

    fn config_hash(&self) -> String {
        "fake".into()
    }

    async fn synthesize(&self, text: &str, _emotion: &EmotionTag) -> TTSResult<AudioData> {
        let started = Instant::now();
        if let Some(delay) = self.latency.get(text) {
            tokio::time::sleep(*delay).await;
        }
        self.calls
            .lock()
            .push((text.to_string(), started, Instant::now()));
        if self.failing.iter().any(|t| t == text) {
            return Err(TTSError::NoAudio);
        }
        Ok(AudioData::from_bytes(text.as_bytes().to_vec()))
    }
}

#[derive(Default)]
struct FakeSink {
    play_time: Duration,
    fail_on: Option<EmotionTag>,
    played: Mutex<Vec<String>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

#[async_trait]
impl PlaybackSink for FakeSink {
    async fn play(&self, audio: &AudioData, emotion: &EmotionTag) -> Result<(), PlaybackError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.play_time).await;
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.as_ref() == Some(emotion) {
            return Err(PlaybackError::Device("speaker unplugged".into()));
        }
        self.played
            .lock()
            .push(String::from_utf8_lossy(&audio.data).into_owned());
        Ok(())
    }
}

fn sequencer(synth: Arc<FakeSynth>, sink: Arc<FakeSink>, interval_ms: u64) -> SpeechSequencer {
    SpeechSequencer::new(
        synth,
        sink,
        SequencerConfig {
            min_synthesis_interval: Duration::from_millis(interval_ms),
        },
    )
}

fn say(text: &str) -> Utterance {
    Utterance::new(EmotionTag::Neutral, text)
}

fn recording_callbacks(log: &Arc<Mutex<Vec<String>>>) -> JobCallbacks {
    let start_log = log.clone();
    let complete_log = log.clone();
    JobCallbacks::new()
        .on_start(move |job| {
            start_log
                .lock()
                .push(format!("start:{}", job.utterance.text))
        })
        .on_complete(move |job| {
            complete_log
                .lock()
                .push(format!("complete:{}", job.utterance.text))
        })
}

// =============================================================================
// Ordering
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_playback_follows_submission_order_despite_latency() {
    let synth = Arc::new(FakeSynth {
        latency: HashMap::from([
            ("slow".to_string(), Duration::from_secs(5)),
            ("fast".to_string(), Duration::from_millis(10)),
        ]),
        ..Default::default()
    });
    let sink = Arc::new(FakeSink {
        play_time: Duration::from_millis(300),
        ..Default::default()
    });
    let seq = sequencer(synth.clone(), sink.clone(), 100);
    let log = Arc::new(Mutex::new(Vec::new()));

    let a = seq.submit(say("slow"), recording_callbacks(&log)).unwrap();
    let b = seq.submit(say("fast"), recording_callbacks(&log)).unwrap();
    let c = seq.submit(say("last"), recording_callbacks(&log)).unwrap();
    assert_eq!(
        (a.sequence_index(), b.sequence_index(), c.sequence_index()),
        (0, 1, 2)
    );

    assert_eq!(a.outcome().await, JobOutcome::Played);
    assert_eq!(b.outcome().await, JobOutcome::Played);
    assert_eq!(c.outcome().await, JobOutcome::Played);

    assert_eq!(*sink.played.lock(), vec!["slow", "fast", "last"]);
    assert_eq!(
        *log.lock(),
        vec![
            "start:slow",
            "complete:slow",
            "start:fast",
            "complete:fast",
            "start:last",
            "complete:last",
        ]
    );
    assert_eq!(sink.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_synthesis_runs_ahead_of_slow_playback() {
    let synth = Arc::new(FakeSynth::default());
    let sink = Arc::new(FakeSink {
        play_time: Duration::from_secs(10),
        ..Default::default()
    });
    let seq = sequencer(synth.clone(), sink.clone(), 1000);

    let started = Instant::now();
    let handles = seq.submit_all([say("one"), say("two"), say("three")]).unwrap();
    for handle in handles {
        assert_eq!(handle.outcome().await, JobOutcome::Played);
    }

    // All three synthesized during the first playback.
    let calls = synth.calls.lock().clone();
    assert_eq!(calls.len(), 3);
    assert!(calls[2].1 - started < Duration::from_secs(10));
    assert_eq!(*sink.played.lock(), vec!["one", "two", "three"]);
}

// =============================================================================
// Throttle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_synthesis_calls_are_spaced() {
    let synth = Arc::new(FakeSynth {
        latency: HashMap::from([("b".to_string(), Duration::from_millis(200))]),
        ..Default::default()
    });
    let sink = Arc::new(FakeSink::default());
    let seq = sequencer(synth.clone(), sink, 1000);

    let started = Instant::now();
    seq.submit_all([say("a"), say("b"), say("c"), say("d")])
        .unwrap();
    seq.idle().await;

    let calls = synth.calls.lock().clone();
    assert_eq!(calls.len(), 4);
    // First call is not delayed.
    assert!(calls[0].1 - started < Duration::from_millis(1));
    for pair in calls.windows(2) {
        let (_, _, prev_returned) = &pair[0];
        let (_, next_started, _) = &pair[1];
        assert!(
            *next_started - *prev_returned >= Duration::from_millis(1000),
            "calls too close: {:?}",
            *next_started - *prev_returned
        );
    }
}

#[tokio::test(start_paused = true)]
async fn test_no_wait_after_long_gap() {
    let synth = Arc::new(FakeSynth::default());
    let sink = Arc::new(FakeSink::default());
    let seq = sequencer(synth.clone(), sink, 1000);

    seq.submit(say("first"), JobCallbacks::default())
        .unwrap()
        .outcome()
        .await;
    tokio::time::sleep(Duration::from_secs(5)).await;

    let before = Instant::now();
    seq.submit(say("second"), JobCallbacks::default())
        .unwrap()
        .outcome()
        .await;
    let calls = synth.calls.lock().clone();
    assert!(calls[1].1 - before < Duration::from_millis(1));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_synthesis_failure_is_skipped() {
    let synth = Arc::new(FakeSynth {
        failing: vec!["broken".to_string()],
        ..Default::default()
    });
    let sink = Arc::new(FakeSink::default());
    let seq = sequencer(synth.clone(), sink.clone(), 10);
    let log = Arc::new(Mutex::new(Vec::new()));

    let a = seq.submit(say("broken"), recording_callbacks(&log)).unwrap();
    let b = seq.submit(say("fine"), recording_callbacks(&log)).unwrap();

    assert_eq!(a.outcome().await, JobOutcome::NoAudio);
    assert_eq!(b.outcome().await, JobOutcome::Played);
    assert_eq!(*sink.played.lock(), vec!["fine"]);
    assert_eq!(
        *log.lock(),
        vec![
            "start:broken",
            "complete:broken",
            "start:fine",
            "complete:fine"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_playback_failure_does_not_stall() {
    let synth = Arc::new(FakeSynth::default());
    let sink = Arc::new(FakeSink {
        fail_on: Some(EmotionTag::Angry),
        ..Default::default()
    });
    let seq = sequencer(synth, sink.clone(), 10);

    let a = seq
        .submit(Utterance::new(EmotionTag::Angry, "grr"), JobCallbacks::default())
        .unwrap();
    let b = seq.submit(say("calm"), JobCallbacks::default()).unwrap();

    assert_eq!(a.outcome().await, JobOutcome::PlaybackFailed);
    assert_eq!(b.outcome().await, JobOutcome::Played);
    assert_eq!(*sink.played.lock(), vec!["calm"]);
}

#[tokio::test]
async fn test_missing_credential_rejects_submission() {
    let synth = Arc::new(FakeSynth {
        no_key: true,
        ..Default::default()
    });
    let seq = sequencer(synth.clone(), Arc::new(FakeSink::default()), 10);

    let err = seq
        .submit(say("hello"), JobCallbacks::default())
        .unwrap_err();
    assert_eq!(
        err,
        SequencerError::InvalidCredential(TTSError::InvalidCredential)
    );
    assert_eq!(seq.pending(), 0);
    assert_eq!(synth.call_count(), 0);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_idle_waits_for_all_jobs() {
    let synth = Arc::new(FakeSynth::default());
    let sink = Arc::new(FakeSink {
        play_time: Duration::from_millis(500),
        ..Default::default()
    });
    let seq = sequencer(synth, sink.clone(), 100);

    seq.submit_all([say("x"), say("y")]).unwrap();
    assert_eq!(seq.pending(), 2);
    seq.idle().await;
    assert_eq!(seq.pending(), 0);
    assert_eq!(sink.played.lock().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_pending_jobs() {
    let synth = Arc::new(FakeSynth {
        latency: HashMap::from([("long".to_string(), Duration::from_secs(30))]),
        ..Default::default()
    });
    let sink = Arc::new(FakeSink::default());
    let seq = sequencer(synth.clone(), sink.clone(), 100);
    let log = Arc::new(Mutex::new(Vec::new()));

    let a = seq.submit(say("long"), recording_callbacks(&log)).unwrap();
    let b = seq.submit(say("queued"), recording_callbacks(&log)).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    seq.reset();
    assert_eq!(a.outcome().await, JobOutcome::Cancelled);
    assert_eq!(b.outcome().await, JobOutcome::Cancelled);
    seq.idle().await;

    let c = seq.submit(say("after"), recording_callbacks(&log)).unwrap();
    assert_eq!(c.sequence_index(), 2);
    assert_eq!(c.outcome().await, JobOutcome::Played);

    assert_eq!(*sink.played.lock(), vec!["after"]);
    assert_eq!(*log.lock(), vec!["start:after", "complete:after"]);
}

#[tokio::test]
async fn test_dispose_rejects_further_submissions() {
    let seq = sequencer(
        Arc::new(FakeSynth::default()),
        Arc::new(FakeSink::default()),
        10,
    );
    assert!(!seq.is_disposed());
    seq.dispose();
    assert!(seq.is_disposed());
    assert_eq!(
        seq.submit(say("late"), JobCallbacks::default())
            .unwrap_err(),
        SequencerError::Disposed
    );
    // Reset after dispose stays disposed.
    seq.reset();
    assert!(seq.is_disposed());
}

#[tokio::test]
async fn test_sequencers_have_distinct_sessions() {
    let a = sequencer(
        Arc::new(FakeSynth::default()),
        Arc::new(FakeSink::default()),
        10,
    );
    let b = sequencer(
        Arc::new(FakeSynth::default()),
        Arc::new(FakeSink::default()),
        10,
    );
    assert_ne!(a.session_id(), b.session_id());
    assert_eq!(a.config().min_synthesis_interval, Duration::from_millis(10));
}
