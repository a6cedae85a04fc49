pub mod state;
pub mod turn;

// Re-export the main entry points for the binary that drives the chat loop.
pub use state::{AppState, SessionState};
pub use turn::{run_turn, TurnOutcome};
