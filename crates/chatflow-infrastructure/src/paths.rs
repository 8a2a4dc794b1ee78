//! Unified path management for chatflow client storage.
//!
//! All client-side state lives under the platform data directory:
//!
//! ```text
//! ~/.local/share/chatflow/       # data directory
//! ├── visitor_id                 # minted once, never rotated
//! ├── active_session             # session id of the visible conversation
//! ├── nudge_dismissed            # presence = the nudge was dismissed
//! ├── active/
//! │   └── <session_id>.json      # bounded tab-scoped message log
//! └── transcripts/
//!     └── <session_id>.json      # full durable transcript + sync cursor
//!
//! ~/.config/chatflow/
//! └── config.toml                # endpoints and credential
//! ```

use chatflow_core::error::{ChatflowError, Result};
use std::path::PathBuf;

/// Returns the chatflow data directory (not created).
pub fn data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("chatflow"))
        .ok_or_else(|| ChatflowError::io("Cannot determine platform data directory"))
}

/// Returns the chatflow configuration directory (not created).
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("chatflow"))
        .ok_or_else(|| ChatflowError::io("Cannot determine platform config directory"))
}
