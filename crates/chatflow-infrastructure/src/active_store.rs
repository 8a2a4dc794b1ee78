//! Tab-scoped transcript store.
//!
//! Backs the visible conversation: survives navigation within the widget's
//! lifetime, is cleared entirely on reload, and is bounded so a very long
//! conversation cannot grow without limit. The durable store keeps the
//! full history for delivery purposes.

use chatflow_core::error::Result;
use chatflow_core::message::Message;
use chatflow_core::transcript::Transcript;
use std::fs;
use std::path::{Path, PathBuf};

/// Oldest messages beyond this count are evicted on save.
pub const MAX_ACTIVE_MESSAGES: usize = 200;

/// Bounded message log for the active session, one JSON file per session.
pub struct ActiveTranscriptStore {
    dir: PathBuf,
}

impl ActiveTranscriptStore {
    /// Creates the store under `<base>/active/`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = base_dir.as_ref().join("active");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn default_location() -> Result<Self> {
        Self::new(crate::paths::data_dir()?)
    }

    /// Saves the newest [`MAX_ACTIVE_MESSAGES`] messages of the transcript.
    pub fn save(&self, transcript: &Transcript) -> Result<()> {
        let messages = transcript.messages();
        let start = messages.len().saturating_sub(MAX_ACTIVE_MESSAGES);
        let json = serde_json::to_string(&messages[start..])?;
        fs::write(self.file_path(transcript.session_id()), json)?;
        Ok(())
    }

    /// Loads the visible message log for a session, if present.
    pub fn load(&self, session_id: &str) -> Result<Option<Vec<Message>>> {
        let path = self.file_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Drops the visible log for a session; called on reload.
    pub fn clear(&self, session_id: &str) -> Result<()> {
        let path = self.file_path(session_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn file_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatflow_core::message::MessageRole;
    use tempfile::TempDir;

    fn transcript_with(n: usize) -> Transcript {
        let mut t = Transcript::new("sid", "vid");
        for i in 0..n {
            t.append(MessageRole::User, format!("message {i}"));
        }
        t
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let store = ActiveTranscriptStore::new(temp_dir.path()).unwrap();

        store.save(&transcript_with(3)).unwrap();
        let loaded = store.load("sid").unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content, "message 0");
    }

    #[test]
    fn test_eviction_bound() {
        let temp_dir = TempDir::new().unwrap();
        let store = ActiveTranscriptStore::new(temp_dir.path()).unwrap();

        store.save(&transcript_with(MAX_ACTIVE_MESSAGES + 5)).unwrap();
        let loaded = store.load("sid").unwrap().unwrap();
        assert_eq!(loaded.len(), MAX_ACTIVE_MESSAGES);
        // Oldest evicted first.
        assert_eq!(loaded[0].content, "message 5");
    }

    #[test]
    fn test_clear_removes_log() {
        let temp_dir = TempDir::new().unwrap();
        let store = ActiveTranscriptStore::new(temp_dir.path()).unwrap();

        store.save(&transcript_with(1)).unwrap();
        store.clear("sid").unwrap();
        assert!(store.load("sid").unwrap().is_none());

        // Clearing an absent log is fine.
        store.clear("sid").unwrap();
    }
}
