//! Application layer: the stream pacer, the background sync agent, the
//! session lifecycle manager, and the orchestrator that drives a full
//! conversation turn across the core, infrastructure, and transport
//! crates.

pub mod orchestrator;
pub mod pacer;
pub mod session_manager;
pub mod sync_agent;

pub use orchestrator::{sources_markup, AssistantExchange, ChatTurn, StreamOrchestrator};
pub use pacer::{Pacer, StreamOutcome};
pub use session_manager::SessionIdentityManager;
pub use sync_agent::{SyncAgent, DEFAULT_FLUSH_DEBOUNCE};
