pub mod chat;
pub mod paths;
pub mod prune;
