//! crates/nexus_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::{Document, ModelReply, ModelRequest};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The error taxonomy shared by all port operations and the orchestration loop.
/// This abstracts away the specific errors from external services.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// A precondition failed before any network call was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The identity or the backing store is not yet established.
    #[error("Not ready: {0}")]
    NotReady(String),
    /// A turn is already in flight for this session.
    #[error("A turn is already in progress")]
    Busy,
    /// The completion endpoint failed after all retry attempts were exhausted.
    #[error("Transport failure: {0}")]
    Transport(String),
    /// The completion endpoint answered with an unrecognized shape
    /// (no candidate, or a part that is neither text nor a function call).
    #[error("Malformed model reply: {0}")]
    MalformedReply(String),
    /// Both rounds of a turn completed without a terminal outcome.
    #[error("The model could not finalize a reply within the allowed tool rounds")]
    ExhaustedRounds,
    /// The document persistence backend failed.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A catch-all for any other unexpected errors.
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// One logical request/response exchange with the completion endpoint.
///
/// Implementations own transient-failure tolerance: a successful return value
/// is an already parsed and classified reply, and a `Transport` error means
/// every attempt of the retry envelope failed.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn generate(&self, request: ModelRequest) -> PortResult<ModelReply>;
}

/// The external persistence backend for private documents, scoped per identity.
///
/// The collection is observed, not polled: every mutation re-materializes the
/// full document set (sorted by creation time descending) and publishes it on
/// the snapshot channel returned by [`DocumentBackend::subscribe`].
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Inserts a document with a backend-assigned creation time. The created
    /// record is not returned; visibility comes from the snapshot channel.
    async fn insert(&self, user_id: Uuid, title: &str, content: &str) -> PortResult<()>;

    /// Removes a document by id. Deleting an already-absent id is success.
    async fn delete(&self, user_id: Uuid, id: Uuid) -> PortResult<()>;

    /// Subscribes to full-snapshot updates. The receiver always holds the most
    /// recently delivered snapshot.
    fn subscribe(&self) -> watch::Receiver<Vec<Document>>;
}

/// An opaque identity provider yielding a stable user identifier once ready.
#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn current_user(&self) -> PortResult<Uuid>;
}
