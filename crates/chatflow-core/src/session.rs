//! Session identity types.
//!
//! A session scopes one visible conversation in the widget; its id rotates
//! on a full page reload. The visitor id is minted once per client and
//! survives across sessions and tabs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity pair consumed by the orchestrator and the sync agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque conversation-scoped token; rotates on reload.
    pub session_id: String,
    /// Opaque cross-session token; stable for the lifetime of the client
    /// storage. Used only for attribution in the synced transcript.
    pub visitor_id: String,
}

/// How the page hosting the widget was reached.
///
/// Reported by the embedding host (navigation-timing classification in a
/// browser); a reload resets the visible conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    /// Fresh navigation to the page.
    Navigate,
    /// Full page reload.
    Reload,
    /// History back/forward traversal; treated like plain navigation.
    BackForward,
}

impl NavigationKind {
    /// True when the visible conversation must be reset.
    pub fn is_reload(self) -> bool {
        matches!(self, Self::Reload)
    }
}

/// Mints a new opaque identity token.
pub fn mint_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minted_ids_are_unique() {
        assert_ne!(mint_id(), mint_id());
    }

    #[test]
    fn test_only_reload_resets() {
        assert!(NavigationKind::Reload.is_reload());
        assert!(!NavigationKind::Navigate.is_reload());
        assert!(!NavigationKind::BackForward.is_reload());
    }
}
