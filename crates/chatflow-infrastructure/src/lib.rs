//! Filesystem persistence for the chatflow widget: client identity, the
//! bounded tab-scoped message log, and the durable transcript keyed by
//! session id.

pub mod active_store;
pub mod durable_store;
pub mod identity_store;
pub mod paths;

pub use crate::active_store::{ActiveTranscriptStore, MAX_ACTIVE_MESSAGES};
pub use crate::durable_store::DurableTranscriptStore;
pub use crate::identity_store::IdentityStore;
