pub mod chat;
pub mod conversation;
pub mod emotion;
pub mod segmenter;
pub mod sequencer;
pub mod tts;

// Re-export commonly used types for convenience
pub use chat::{ChatClient, ChatConfig, ChatError, ChatMessage, ChatResult, RetryPolicy, Role};

pub use conversation::{ConversationError, PromptLanguage, Transcript, TurnRunner, TurnSummary};

pub use emotion::{EmotionTag, ProsodyHint};

pub use segmenter::{Segmenter, SegmenterConfig, Utterance, segment_stream};

pub use sequencer::{
    JobCallbacks, JobHandle, JobOutcome, SequencerConfig, SequencerError, SpeechJob,
    SpeechSequencer,
};

pub use tts::{
    AudioData, BoxedSynthesizer, CachedSynthesizer, DashScopeTTS, DashScopeTTSConfig,
    SpeechSynthesizer, TTSError, TTSResult, create_synthesizer,
};
