//! services/assistant/src/lib.rs
//!
//! Library surface of the assistant service: configuration, the service error
//! type, the retry combinator, concrete adapters, and the chat orchestration.

pub mod adapters;
pub mod chat;
pub mod config;
pub mod error;
pub mod retry;
