use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use zeroize::Zeroize;

use super::{ConversationError, Transcript};
use crate::core::chat::{ChatClient, ChatError, ChatMessage};
use crate::core::segmenter::{SegmenterConfig, Utterance, segment_stream};
use crate::core::sequencer::{JobCallbacks, JobHandle, JobOutcome, SequencerError, SpeechSequencer};

/// Called with the reply text spoken so far, each time a sentence starts playing.
pub type DisplayCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Result of one completed turn.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TurnSummary {
    /// `"[tag] sentence"` pieces concatenated; appended to the transcript.
    pub assistant_log: String,
    /// Sentences joined with a space, without tags.
    pub display_text: String,
    pub utterances: Vec<Utterance>,
    /// Playback outcome per utterance; empty when speech was unavailable.
    pub outcomes: Vec<JobOutcome>,
    /// Set when the sequencer refused the turn's speech jobs.
    pub speech_error: Option<SequencerError>,
    /// Set when the reply stream broke after it had started; the fields
    /// above then hold the part received before the break.
    pub stream_error: Option<ChatError>,
}

/// Runs conversation turns: chat stream, segmentation, speech.
pub struct TurnRunner {
    client: ChatClient,
    api_key: String,
    sequencer: Arc<SpeechSequencer>,
    system_prompt: String,
    segmenter: SegmenterConfig,
    on_display: Option<DisplayCallback>,
}

impl TurnRunner {
    pub fn new(
        client: ChatClient,
        api_key: impl Into<String>,
        sequencer: Arc<SpeechSequencer>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            sequencer,
            system_prompt: system_prompt.into(),
            segmenter: SegmenterConfig::default(),
            on_display: None,
        }
    }

    pub fn with_segmenter(mut self, config: SegmenterConfig) -> Self {
        self.segmenter = config;
        self
    }

    pub fn with_display(mut self, callback: DisplayCallback) -> Self {
        self.on_display = Some(callback);
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    pub fn sequencer(&self) -> &Arc<SpeechSequencer> {
        &self.sequencer
    }

    /// Run one turn for `user_text`.
    ///
    /// A missing chat key fails before the transcript is touched. Otherwise
    /// the user message is appended first and the assistant message once
    /// playback has drained. Errors before the reply starts leave the user
    /// message in place. A stream that breaks mid-reply still completes the
    /// turn with what was received, recorded in `stream_error`. Cancellation
    /// resets the sequencer and restores the transcript to its state before
    /// the call.
    pub async fn run(
        &self,
        transcript: &mut Transcript,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary, ConversationError> {
        ChatClient::check_credential(&self.api_key)?;

        let restore_len = transcript.len();
        transcript.push(ChatMessage::user(user_text));

        let result = self.stream_turn(transcript, cancel).await;
        match result {
            Ok(summary) => {
                if !summary.assistant_log.is_empty() {
                    transcript.push(ChatMessage::assistant(summary.assistant_log.clone()));
                }
                info!(
                    sentences = summary.utterances.len(),
                    played = summary
                        .outcomes
                        .iter()
                        .filter(|o| **o == JobOutcome::Played)
                        .count(),
                    "Turn completed"
                );
                Ok(summary)
            }
            Err(ConversationError::Cancelled) => {
                self.sequencer.reset();
                transcript.truncate(restore_len);
                info!("Turn cancelled");
                Err(ConversationError::Cancelled)
            }
            Err(e) => Err(e),
        }
    }

    async fn stream_turn(
        &self,
        transcript: &Transcript,
        cancel: &CancellationToken,
    ) -> Result<TurnSummary, ConversationError> {
        let messages = transcript.request_messages(&self.system_prompt);

        let fragments = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(ConversationError::Cancelled),
            stream = self.client.stream_reply(&messages, &self.api_key) => stream?,
        };
        let utterances = segment_stream(fragments, self.segmenter);
        futures::pin_mut!(utterances);

        let mut summary = TurnSummary::default();
        let mut sentences: Vec<String> = Vec::new();
        let mut handles: Vec<JobHandle> = Vec::new();

        loop {
            let utterance = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ConversationError::Cancelled),
                next = utterances.next() => match next {
                    Some(Ok(utterance)) => utterance,
                    Some(Err(e)) => {
                        warn!(
                            error = %e,
                            sentences = summary.utterances.len(),
                            "Reply stream broke, keeping the partial reply"
                        );
                        summary.stream_error = Some(e);
                        break;
                    }
                    None => break,
                },
            };

            summary.assistant_log.push_str(&utterance.tagged_text());
            sentences.push(utterance.text.clone());
            summary.utterances.push(utterance.clone());

            if summary.speech_error.is_some() {
                continue;
            }
            match self.sequencer.submit(utterance, self.display_callbacks(sentences.join(" "))) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    warn!(error = %e, "Speech unavailable for this turn");
                    summary.speech_error = Some(e);
                }
            }
        }

        summary.display_text = sentences.join(" ");

        for handle in handles {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(ConversationError::Cancelled),
                outcome = handle.outcome() => outcome,
            };
            summary.outcomes.push(outcome);
        }

        Ok(summary)
    }

    fn display_callbacks(&self, display_so_far: String) -> JobCallbacks {
        match &self.on_display {
            Some(on_display) => {
                let on_display = on_display.clone();
                JobCallbacks::new().on_start(move |_| on_display(&display_so_far))
            }
            None => JobCallbacks::default(),
        }
    }
}

impl Drop for TurnRunner {
    fn drop(&mut self) {
        self.api_key.zeroize();
    }
}
