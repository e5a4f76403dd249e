//! # jot-store
//!
//! SQLite-backed local store for the jot sync core.
//!
//! This crate provides:
//! - Connection pool management and schema bootstrap
//! - Repository implementations for notes, folders, and attachments
//! - Dirty-flag tracking for rows pending upload
//! - High-water-mark queries that bound incremental downloads
//!
//! The local store is the single source of truth: every user mutation lands
//! here first (marked dirty), and the sync engine reconciles it with the
//! remote service in the background. Payload columns hold ciphertext only;
//! encryption happens before values reach this crate.
//!
//! ## Example
//!
//! ```
//! use jot_core::{Note, NoteStore};
//! use jot_store::LocalStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> jot_core::Result<()> {
//! let store = LocalStore::connect_memory().await?;
//!
//! let note = Note::new("2jk9aGVsbG8=".into(), "x0QaZ3JvY2VyaWVz".into(), None);
//! store.notes.put(&note).await?;
//!
//! // New rows are dirty until a sync pass confirms their upload.
//! assert_eq!(store.notes.list_dirty().await?.len(), 1);
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;
use uuid::Uuid;

pub mod attachments;
pub mod folders;
pub mod notes;

// Re-export core types
pub use jot_core::*;

pub use attachments::SqliteAttachments;
pub use folders::SqliteFolders;
pub use notes::SqliteNotes;

/// Encode a timestamp for storage. The format is fixed width UTC, so
/// lexicographic order equals chronological order; the MAX() high-water
/// queries rely on this.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a stored timestamp.
pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("corrupt timestamp {:?} in local store: {}", raw, e)))
}

/// Decode a stored entity id.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| Error::Internal(format!("corrupt id {:?} in local store: {}", raw, e)))
}

/// Schema bootstrap statements, executed one at a time in order.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS notes (
        id                TEXT PRIMARY KEY,
        encrypted_title   TEXT NOT NULL,
        encrypted_content TEXT NOT NULL,
        folder_id         TEXT,
        pinned            INTEGER NOT NULL DEFAULT 0,
        starred           INTEGER NOT NULL DEFAULT 0,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL,
        attachment_ids    TEXT NOT NULL DEFAULT '[]',
        dirty             INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_notes_dirty ON notes (dirty)",
    "CREATE INDEX IF NOT EXISTS idx_notes_updated_at ON notes (updated_at)",
    "CREATE TABLE IF NOT EXISTS folders (
        id             TEXT PRIMARY KEY,
        encrypted_name TEXT NOT NULL,
        created_at     TEXT NOT NULL,
        dirty          INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_folders_dirty ON folders (dirty)",
    "CREATE TABLE IF NOT EXISTS attachments (
        id         TEXT PRIMARY KEY,
        note_id    TEXT NOT NULL,
        kind       TEXT NOT NULL,
        blob       BLOB NOT NULL,
        created_at TEXT NOT NULL,
        dirty      INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE INDEX IF NOT EXISTS idx_attachments_dirty ON attachments (dirty)",
    "CREATE INDEX IF NOT EXISTS idx_attachments_note_id ON attachments (note_id)",
    "CREATE INDEX IF NOT EXISTS idx_attachments_created_at ON attachments (created_at)",
];

/// Combined local store context with all repositories.
#[derive(Clone)]
pub struct LocalStore {
    /// The underlying connection pool.
    pub pool: SqlitePool,
    /// Note repository.
    pub notes: SqliteNotes,
    /// Folder repository.
    pub folders: SqliteFolders,
    /// Attachment repository.
    pub attachments: SqliteAttachments,
}

impl LocalStore {
    /// Create a new LocalStore instance from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            notes: SqliteNotes::new(pool.clone()),
            folders: SqliteFolders::new(pool.clone()),
            attachments: SqliteAttachments::new(pool.clone()),
            pool,
        }
    }

    /// Open (creating if missing) the store at the given path and bootstrap
    /// the schema.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let start = Instant::now();

        info!(
            subsystem = "store",
            component = "sqlite",
            op = "connect",
            path = %path.display(),
            "Opening local store"
        );

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(Error::Database)?;

        Self::init_schema(&pool).await?;

        info!(
            subsystem = "store",
            component = "sqlite",
            op = "ready",
            duration_ms = start.elapsed().as_millis() as u64,
            "Local store ready"
        );
        Ok(Self::new(pool))
    }

    /// Open an in-memory store, used by tests and throwaway sessions.
    pub async fn connect_memory() -> Result<Self> {
        // Every sqlite in-memory connection is its own private database, so
        // the pool must be pinned to a single never-expiring connection.
        let options = SqliteConnectOptions::new().in_memory(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(Error::Database)?;

        Self::init_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(pool)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }
}
