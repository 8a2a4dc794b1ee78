//! Endpoint configuration for the widget's owning system.
//!
//! Loaded from `~/.config/chatflow/config.toml` with environment-variable
//! fallback. The auth token is the opaque credential every outbound
//! request to the owning system carries; issuing it is outside this core.

use chatflow_core::error::{ChatflowError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

fn default_use_stream() -> bool {
    true
}

/// Endpoints and credential for the assistant and sync services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Base URL of the assistant service; `/chat`, `/chat_stream` and
    /// `/clear` hang off it.
    pub base_url: String,
    /// Transcript sync endpoint on the owning system.
    pub save_url: String,
    /// Opaque credential attached to sync deliveries.
    pub auth_token: String,
    /// Prefer the streaming exchange over the JSON fallback.
    #[serde(default = "default_use_stream")]
    pub use_stream: bool,
}

impl TransportConfig {
    pub fn new(
        base_url: impl Into<String>,
        save_url: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            save_url: save_url.into(),
            auth_token: auth_token.into(),
            use_stream: true,
        }
    }

    /// Loads configuration, trying the config file first and environment
    /// variables second (CHATFLOW_BASE_URL, CHATFLOW_SAVE_URL,
    /// CHATFLOW_AUTH_TOKEN).
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Self::try_from_env()
    }

    /// Parses a config file at an explicit path.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Builds configuration purely from environment variables.
    pub fn try_from_env() -> Result<Self> {
        let base_url = env::var("CHATFLOW_BASE_URL")
            .map_err(|_| ChatflowError::config("CHATFLOW_BASE_URL not set and no config file"))?;
        let save_url = env::var("CHATFLOW_SAVE_URL")
            .map_err(|_| ChatflowError::config("CHATFLOW_SAVE_URL not set and no config file"))?;
        let auth_token = env::var("CHATFLOW_AUTH_TOKEN")
            .map_err(|_| ChatflowError::config("CHATFLOW_AUTH_TOKEN not set and no config file"))?;
        Ok(Self::new(base_url, save_url, auth_token))
    }

    /// `~/.config/chatflow/config.toml`, platform-adjusted.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("chatflow").join("config.toml"))
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Non-streaming exchange endpoint.
    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base())
    }

    /// Streaming exchange endpoint.
    pub fn stream_url(&self) -> String {
        format!("{}/chat_stream", self.base())
    }

    /// Session-clear notification endpoint.
    pub fn clear_url(&self) -> String {
        format!("{}/clear", self.base())
    }
}
