//! Session persistence.
//!
//! Stores the system prompt and chat log as JSON so a conversation survives
//! restarts. The core pipeline never touches this; the CLI loads a session
//! before the first turn and saves it after every change.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::conversation::Transcript;

/// Persisted conversation state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Session {
    /// Custom system prompt; `None` means the built-in prompt.
    pub system_prompt: Option<String>,
    pub chat_log: Transcript,
}

/// Reads and writes a [`Session`] at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the session; a missing file yields an empty session.
    pub async fn load(&self) -> anyhow::Result<Session> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No saved session");
                return Ok(Session::default());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to read session {}", self.path.display())));
            }
        };
        let session = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Invalid session file {}: {e}", self.path.display()))?;
        Ok(session)
    }

    /// Save the session, creating parent directories as needed.
    pub async fn save(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(session)?;
        tokio::fs::write(&self.path, json).await?;
        debug!(path = %self.path.display(), messages = session.chat_log.len(), "Session saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chat::ChatMessage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_session() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("none.json"));
        assert_eq!(store.load().await.unwrap(), Session::default());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested/session.json"));

        let mut chat_log = Transcript::new();
        chat_log.push(ChatMessage::user("你好"));
        chat_log.push(ChatMessage::assistant("[happy] 你好！"));
        let session = Session {
            system_prompt: Some("be brief".into()),
            chat_log,
        };

        store.save(&session).await.unwrap();
        assert_eq!(store.load().await.unwrap(), session);

        let raw = std::fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"systemPrompt\""));
        assert!(raw.contains("\"chatLog\""));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = SessionStore::new(&path).load().await.unwrap_err();
        assert!(err.to_string().contains("Invalid session file"));
    }
}
