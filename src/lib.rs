pub mod config;
pub mod core;
pub mod playback;
pub mod session;
pub mod utils;

// Re-export commonly used items for convenience
pub use config::{AppConfig, ConfigError};
pub use core::*;
pub use playback::{BoxedSink, FileSink, LogSink, PlaybackError, PlaybackSink};
pub use session::{Session, SessionStore};
