//! Client identity persistence.
//!
//! Holds the cross-session visitor id (minted exactly once), the id of the
//! session currently visible in the widget, and the nudge-dismissed flag.

use chatflow_core::error::Result;
use chatflow_core::session::mint_id;
use std::fs;
use std::path::{Path, PathBuf};

const VISITOR_ID_FILE: &str = "visitor_id";
const ACTIVE_SESSION_FILE: &str = "active_session";
const NUDGE_DISMISSED_FILE: &str = "nudge_dismissed";

/// Legacy artifacts written by an older build; removed on first touch.
const LEGACY_FILES: [&str; 1] = ["sid"];
const LEGACY_LOG_PREFIX: &str = "chat_log_v1_";

/// File-backed identity store under the chatflow data directory.
pub struct IdentityStore {
    base_dir: PathBuf,
}

impl IdentityStore {
    /// Creates the store, ensuring the base directory exists.
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    /// Creates the store at the default platform location.
    pub fn default_location() -> Result<Self> {
        Self::new(crate::paths::data_dir()?)
    }

    /// Returns the stable visitor id, minting and persisting it on the
    /// first-ever call. Never rotates.
    pub fn visitor_id(&self) -> Result<String> {
        let path = self.base_dir.join(VISITOR_ID_FILE);
        if path.exists() {
            let id = fs::read_to_string(&path)?;
            let id = id.trim();
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }
        let id = mint_id();
        fs::write(&path, &id)?;
        Ok(id)
    }

    /// Session id of the currently visible conversation, if any.
    pub fn active_session_id(&self) -> Result<Option<String>> {
        let path = self.base_dir.join(ACTIVE_SESSION_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let id = fs::read_to_string(&path)?;
        let id = id.trim().to_string();
        Ok(if id.is_empty() { None } else { Some(id) })
    }

    pub fn set_active_session_id(&self, session_id: &str) -> Result<()> {
        fs::write(self.base_dir.join(ACTIVE_SESSION_FILE), session_id)?;
        Ok(())
    }

    /// Whether the visitor already dismissed the chat-open nudge.
    pub fn is_nudge_dismissed(&self) -> bool {
        self.base_dir.join(NUDGE_DISMISSED_FILE).exists()
    }

    pub fn set_nudge_dismissed(&self) -> Result<()> {
        fs::write(self.base_dir.join(NUDGE_DISMISSED_FILE), "1")?;
        Ok(())
    }

    /// Re-arms the nudge; called on reload.
    pub fn clear_nudge_dismissed(&self) -> Result<()> {
        let path = self.base_dir.join(NUDGE_DISMISSED_FILE);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// One-time cleanup of storage artifacts from an older build.
    /// Missing files are fine; anything else is reported.
    pub fn migrate_legacy(&self) -> Result<()> {
        for name in LEGACY_FILES {
            let path = self.base_dir.join(name);
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        for entry in fs::read_dir(&self.base_dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                if name.starts_with(LEGACY_LOG_PREFIX) {
                    fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}
