//! Session lifecycle around page navigation.
//!
//! A reload is an intentional "start over" gesture: the old session's
//! local log is dropped, the backend is told to forget its conversational
//! memory, and a fresh session id is minted. Every other navigation kind
//! resumes the stored session. The visitor id survives all of it.

use chatflow_core::delivery::SessionClearNotifier;
use chatflow_core::session::{mint_id, NavigationKind, Session};
use chatflow_core::Result;
use chatflow_infrastructure::{ActiveTranscriptStore, IdentityStore};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SessionIdentityManager {
    identity: Arc<IdentityStore>,
    active: Arc<ActiveTranscriptStore>,
    notifier: Arc<dyn SessionClearNotifier>,
}

impl SessionIdentityManager {
    pub fn new(
        identity: Arc<IdentityStore>,
        active: Arc<ActiveTranscriptStore>,
        notifier: Arc<dyn SessionClearNotifier>,
    ) -> Self {
        Self {
            identity,
            active,
            notifier,
        }
    }

    /// Resolves the session to use for this page view.
    pub fn establish(&self, navigation: NavigationKind) -> Result<Session> {
        if let Err(err) = self.identity.migrate_legacy() {
            warn!("legacy storage cleanup failed: {}", err);
        }
        let visitor_id = self.identity.visitor_id()?;
        let stored = self.identity.active_session_id()?;

        let session_id = if navigation.is_reload() {
            if let Some(old_id) = stored {
                if let Err(err) = self.active.clear(&old_id) {
                    warn!("failed to clear active log for {}: {}", old_id, err);
                }
                self.notifier.notify_clear_detached(&old_id);
            }
            // Reload re-arms the open nudge too.
            if let Err(err) = self.identity.clear_nudge_dismissed() {
                warn!("failed to reset nudge flag: {}", err);
            }
            let fresh = mint_id();
            self.identity.set_active_session_id(&fresh)?;
            debug!(session_id = %fresh, "session rotated on reload");
            fresh
        } else {
            match stored {
                Some(id) => id,
                None => {
                    let fresh = mint_id();
                    self.identity.set_active_session_id(&fresh)?;
                    fresh
                }
            }
        };

        Ok(Session {
            session_id,
            visitor_id,
        })
    }
}
