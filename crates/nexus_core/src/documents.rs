//! crates/nexus_core/src/documents.rs
//!
//! The document store boundary: validation and identity scoping in front of
//! the external persistence backend. Reads never go through here; consumers
//! observe the backend's snapshot channel instead.

use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;

use crate::domain::Document;
use crate::ports::{DocumentBackend, PortError, PortResult};

/// CRUD-lite boundary to the persistence backend, scoped to one
/// authenticated identity. Constructing one requires a resolved identity and
/// a connected backend, so readiness is structural.
#[derive(Clone)]
pub struct DocumentStore {
    backend: Arc<dyn DocumentBackend>,
    user_id: Uuid,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>, user_id: Uuid) -> Self {
        Self { backend, user_id }
    }

    /// Inserts a new document. Title and content must be non-empty after
    /// trimming; a precondition failure makes no backend call. The created
    /// record becomes visible through the snapshot channel, not a return value.
    pub async fn create(&self, title: &str, content: &str) -> PortResult<()> {
        let title = title.trim();
        let content = content.trim();
        if title.is_empty() {
            return Err(PortError::InvalidInput(
                "Document title must not be empty".to_string(),
            ));
        }
        if content.is_empty() {
            return Err(PortError::InvalidInput(
                "Document content must not be empty".to_string(),
            ));
        }
        self.backend.insert(self.user_id, title, content).await
    }

    /// Deletes a document by id. Idempotent from the caller's perspective:
    /// an already-absent id is treated as success.
    pub async fn delete(&self, id: Uuid) -> PortResult<()> {
        self.backend.delete(self.user_id, id).await
    }

    /// Subscribes to full-snapshot updates of this identity's documents.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Document>> {
        self.backend.subscribe()
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A backend stub that counts mutations and publishes nothing.
    struct CountingBackend {
        inserts: AtomicUsize,
        deletes: AtomicUsize,
        feed: watch::Sender<Vec<Document>>,
    }

    impl CountingBackend {
        fn new() -> Self {
            let (feed, _) = watch::channel(Vec::new());
            Self {
                inserts: AtomicUsize::new(0),
                deletes: AtomicUsize::new(0),
                feed,
            }
        }
    }

    #[async_trait]
    impl DocumentBackend for CountingBackend {
        async fn insert(&self, _user_id: Uuid, _title: &str, _content: &str) -> PortResult<()> {
            self.inserts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn delete(&self, _user_id: Uuid, _id: Uuid) -> PortResult<()> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn subscribe(&self) -> watch::Receiver<Vec<Document>> {
            self.feed.subscribe()
        }
    }

    fn store() -> (DocumentStore, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::new());
        (
            DocumentStore::new(backend.clone(), Uuid::new_v4()),
            backend,
        )
    }

    #[tokio::test]
    async fn create_inserts_trimmed_document() {
        let (store, backend) = store();
        store.create("  Q4 Goals  ", "  Ship the beta.  ").await.unwrap();
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_title_is_rejected_before_any_backend_call() {
        let (store, backend) = store();
        let result = store.create("   ", "content").await;
        assert!(matches!(result, Err(PortError::InvalidInput(_))));
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_content_is_rejected_before_any_backend_call() {
        let (store, backend) = store();
        let result = store.create("title", "\n\t ").await;
        assert!(matches!(result, Err(PortError::InvalidInput(_))));
        assert_eq!(backend.inserts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delete_of_unknown_id_succeeds() {
        let (store, backend) = store();
        store.delete(Uuid::new_v4()).await.unwrap();
        assert_eq!(backend.deletes.load(Ordering::SeqCst), 1);
    }
}
