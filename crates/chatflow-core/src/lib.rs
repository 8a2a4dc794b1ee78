//! Domain core of the chatflow widget: transcript model, session identity,
//! markup sanitization, and the stream buffer behind the smooth reveal.
//!
//! Everything in this crate is pure or in-memory; persistence lives in
//! `chatflow-infrastructure` and network IO in `chatflow-transport`.

pub mod buffer;
pub mod config;
pub mod delivery;
pub mod error;
pub mod message;
pub mod sanitize;
pub mod session;
pub mod transcript;

// Re-export common error type
pub use error::{ChatflowError, Result};
