//! services/assistant/src/chat/state.rs
//!
//! Defines the application's shared and session-specific states.

use nexus_core::domain::{Document, Message};
use nexus_core::ports::CompletionService;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across the Whole Process)
//=========================================================================================

/// The shared application state, created once at startup.
#[derive(Clone)]
pub struct AppState {
    pub completion: Arc<dyn CompletionService>,
    /// The most recently delivered document snapshot. Always read at call
    /// time; never pinned for a whole turn.
    pub documents: watch::Receiver<Vec<Document>>,
}

//=========================================================================================
// SessionState (One Interactive Session)
//=========================================================================================

/// The state for a single chat session: the append-only conversation log and
/// the busy gate that keeps at most one turn in flight.
pub struct SessionState {
    pub user_id: Uuid,
    /// Append-only; messages are never edited or deleted individually.
    pub messages: Vec<Message>,
    /// Set while a turn is in flight; new submissions are rejected until it
    /// clears.
    pub busy: bool,
}

impl SessionState {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            messages: Vec::new(),
            busy: false,
        }
    }
}
