//! Durable transcript store.
//!
//! Keeps the full transcript plus its sync cursor, keyed by session id,
//! across reloads. Not subject to the active store's eviction bound: its
//! contents are periodically delivered to the remote store and a fully
//! synced transcript can be pruned.

use chatflow_core::error::Result;
use chatflow_core::transcript::Transcript;
use std::fs;
use std::path::{Path, PathBuf};

/// Full transcript persistence, one JSON file per session.
pub struct DurableTranscriptStore {
    dir: PathBuf,
}

impl DurableTranscriptStore {
    /// Creates the store under `<base>/transcripts/`.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let dir = base_dir.as_ref().join("transcripts");
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn default_location() -> Result<Self> {
        Self::new(crate::paths::data_dir()?)
    }

    pub fn save(&self, transcript: &Transcript) -> Result<()> {
        let json = serde_json::to_string_pretty(transcript)?;
        fs::write(self.file_path(transcript.session_id()), json)?;
        Ok(())
    }

    pub fn load(&self, session_id: &str) -> Result<Option<Transcript>> {
        let path = self.file_path(session_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    pub fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.file_path(session_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Deletes the persisted transcript once every message has been
    /// acknowledged by the remote store. Returns whether it was pruned.
    pub fn prune_if_synced(&self, transcript: &Transcript) -> Result<bool> {
        if transcript.fully_synced() && !transcript.is_empty() {
            self.delete(transcript.session_id())?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Session ids with a transcript still on disk (e.g. interrupted
    /// deliveries from earlier sessions).
    pub fn list_session_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn file_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{session_id}.json"))
    }
}
