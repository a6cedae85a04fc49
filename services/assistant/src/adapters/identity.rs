//! services/assistant/src/adapters/identity.rs
//!
//! A file-backed identity provider implementing the `IdentityService` port.
//! The identifier is opaque and stable: generated once on first run and read
//! back on every start after that.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use nexus_core::ports::{IdentityService, PortError, PortResult};
use tracing::info;
use uuid::Uuid;

/// An adapter that persists a generated user identifier next to the database.
pub struct FileIdentityAdapter {
    path: PathBuf,
}

impl FileIdentityAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl IdentityService for FileIdentityAdapter {
    async fn current_user(&self) -> PortResult<Uuid> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Uuid::parse_str(raw.trim()).map_err(|e| {
                PortError::NotReady(format!(
                    "identity file {} is corrupt: {}",
                    self.path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let id = Uuid::new_v4();
                tokio::fs::write(&self.path, id.to_string())
                    .await
                    .map_err(|e| PortError::NotReady(e.to_string()))?;
                info!("Created new identity at {}", self.path.display());
                Ok(id)
            }
            Err(e) => Err(PortError::NotReady(e.to_string())),
        }
    }
}

//=========================================================================================
// Tests
//=========================================================================================
