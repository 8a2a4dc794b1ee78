//! HTTP transport for the chatflow widget: the streaming/JSON exchange
//! with the assistant service, the session-clear notification, and the
//! transcript sync delivery.

pub mod assistant_client;
pub mod config;
pub mod error;
pub mod sync_client;

pub use assistant_client::{AssistantClient, ChatAnswer, FragmentStream};
pub use config::TransportConfig;
pub use error::TransportError;
pub use sync_client::HttpTranscriptDelivery;
