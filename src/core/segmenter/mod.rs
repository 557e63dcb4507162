//! Sentence segmentation of streamed replies.
//!
//! Turns undifferentiated text fragments into [`Utterance`]s: one
//! emotion tag plus one speakable sentence each.
//!
//! # Rules
//!
//! | Rule | Matches | Example |
//! |------|---------|---------|
//! | tag token | `[word]` at the head of the buffer | `[happy]` |
//! | sentence terminal | first `. ! ? 。 ． ！ ？` or newline run | `Hello there!` |
//! | tag boundary | text before a well-formed tag mid-buffer | `fine [sad]` |
//! | comma threshold | `, 、 ， ; ；` after at least N chars | `This is long enough,` |
//!
//! Units that contain only whitespace, brackets, quotes or punctuation are
//! discarded. On stream end the remaining buffer is flushed as one final
//! utterance.

mod machine;
mod rules;
mod stream;


pub use machine::{
    DEFAULT_COMMA_THRESHOLD, Segmenter, SegmenterConfig, SegmenterState, Utterance,
};
pub use rules::{Rule, TagScan, Token, is_speakable, next_token, scan_tag_token};
pub use stream::segment_stream;
