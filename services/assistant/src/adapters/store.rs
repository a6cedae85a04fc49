//! services/assistant/src/adapters/store.rs
//!
//! This module contains the document backend adapter, the concrete
//! implementation of the `DocumentBackend` port over SQLite using `sqlx`.
//!
//! The collection is push-based: every mutation re-materializes the full
//! document set for the scoped identity, sorted newest-first, and publishes it
//! wholesale on a watch channel. Consumers never poll.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::DateTime;
use nexus_core::domain::Document;
use nexus_core::ports::{DocumentBackend, PortError, PortResult};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use tokio::sync::watch;
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A SQLite-backed document store that implements the `DocumentBackend` port
/// for one identity.
pub struct SqliteBackend {
    pool: SqlitePool,
    /// The identity whose snapshot this backend publishes.
    user_id: Uuid,
    feed: watch::Sender<Vec<Document>>,
}

impl SqliteBackend {
    /// Opens (and creates if missing) the database behind `database_url`.
    pub async fn connect(database_url: &str, user_id: Uuid) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // A single connection: one writer, and the in-memory databases used by
        // tests would otherwise be distinct per connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let (feed, _) = watch::channel(Vec::new());
        Ok(Self {
            pool,
            user_id,
            feed,
        })
    }

    /// Creates the schema at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS documents (
                id         TEXT PRIMARY KEY,
                user_id    TEXT NOT NULL,
                title      TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Re-materializes the full document set and publishes it on the feed.
    /// Called after every mutation and once at startup.
    pub async fn refresh(&self) -> PortResult<()> {
        let records = sqlx::query_as::<_, DocumentRecord>(
            "SELECT id, user_id, title, content, created_at FROM documents
             WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )
        .bind(self.user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| PortError::Backend(e.to_string()))?;

        let documents = records
            .into_iter()
            .map(DocumentRecord::to_domain)
            .collect::<PortResult<Vec<_>>>()?;

        // Replace the snapshot wholesale; no partial merge.
        self.feed.send_replace(documents);
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct DocumentRecord {
    id: String,
    user_id: String,
    title: String,
    content: String,
    created_at: i64,
}

impl DocumentRecord {
    fn to_domain(self) -> PortResult<Document> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| PortError::Backend(format!("corrupt document id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| PortError::Backend(format!("corrupt user id: {e}")))?;
        let created_at = DateTime::from_timestamp(self.created_at, 0).ok_or_else(|| {
            PortError::Backend(format!("corrupt creation time: {}", self.created_at))
        })?;
        Ok(Document {
            id,
            user_id,
            title: self.title,
            content: self.content,
            created_at,
        })
    }
}

//=========================================================================================
// `DocumentBackend` Trait Implementation
//=========================================================================================

#[async_trait]
impl DocumentBackend for SqliteBackend {
    async fn insert(&self, user_id: Uuid, title: &str, content: &str) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO documents (id, user_id, title, content, created_at)
             VALUES (?1, ?2, ?3, ?4, CAST(strftime('%s', 'now') AS INTEGER))",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id.to_string())
        .bind(title)
        .bind(content)
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Backend(e.to_string()))?;

        self.refresh().await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> PortResult<()> {
        // An already-absent id is success, not an error.
        sqlx::query("DELETE FROM documents WHERE id = ?1 AND user_id = ?2")
            .bind(id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Backend(e.to_string()))?;

        self.refresh().await
    }

    fn subscribe(&self) -> watch::Receiver<Vec<Document>> {
        self.feed.subscribe()
    }
}

//=========================================================================================
// Tests
//=========================================================================================
