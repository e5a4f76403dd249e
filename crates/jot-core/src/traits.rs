//! Core traits for the jot sync abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// LOCAL STORE TRAITS
// =============================================================================

/// Repository for local note rows.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// List all notes.
    async fn list(&self) -> Result<Vec<Note>>;

    /// List notes with an unconfirmed local mutation.
    async fn list_dirty(&self) -> Result<Vec<Note>>;

    /// Fetch a note by id.
    async fn get(&self, id: Uuid) -> Result<Option<Note>>;

    /// Insert or replace a whole note row.
    async fn put(&self, note: &Note) -> Result<()>;

    /// Apply a targeted mutation; bumps `updated_at` and marks dirty.
    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<()>;

    /// Delete a note and cascade-delete its attachments.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Flag a note as pending upload.
    async fn mark_dirty(&self, id: Uuid) -> Result<()>;

    /// Clear the dirty flag on exactly the given ids.
    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()>;
}

/// Repository for local folder rows.
#[async_trait]
pub trait FolderStore: Send + Sync {
    /// List all folders.
    async fn list(&self) -> Result<Vec<Folder>>;

    /// List folders with an unconfirmed local mutation.
    async fn list_dirty(&self) -> Result<Vec<Folder>>;

    /// Fetch a folder by id.
    async fn get(&self, id: Uuid) -> Result<Option<Folder>>;

    /// Insert or replace a whole folder row.
    async fn put(&self, folder: &Folder) -> Result<()>;

    /// Apply a targeted mutation; marks dirty.
    async fn update(&self, id: Uuid, patch: FolderPatch) -> Result<()>;

    /// Delete a folder, re-filing its notes to no folder.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Flag a folder as pending upload.
    async fn mark_dirty(&self, id: Uuid) -> Result<()>;

    /// Clear the dirty flag on exactly the given ids.
    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()>;
}

/// Repository for local attachment rows.
///
/// Every write keeps the owning note's attachment-id list consistent within
/// the same transaction.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// List all attachments.
    async fn list(&self) -> Result<Vec<Attachment>>;

    /// List attachments with an unconfirmed local mutation.
    async fn list_dirty(&self) -> Result<Vec<Attachment>>;

    /// List attachments owned by a note, in creation order.
    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<Attachment>>;

    /// Fetch an attachment by id.
    async fn get(&self, id: Uuid) -> Result<Option<Attachment>>;

    /// Insert or replace a whole attachment row.
    async fn put(&self, attachment: &Attachment) -> Result<()>;

    /// Apply a targeted mutation (re-parenting); marks dirty.
    async fn update(&self, id: Uuid, patch: AttachmentPatch) -> Result<()>;

    /// Delete an attachment.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// Flag an attachment as pending upload.
    async fn mark_dirty(&self, id: Uuid) -> Result<()>;

    /// Clear the dirty flag on exactly the given ids.
    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()>;
}

// =============================================================================
// REMOTE STORE TRAITS
// =============================================================================

/// Filter for downloading remote attachments. Either query alone can miss
/// rows, so the engine issues one call per populated field and merges.
#[derive(Debug, Clone, Default)]
pub struct AttachmentQuery {
    /// Restrict to attachments owned by these notes.
    pub note_ids: Option<Vec<Uuid>>,
    /// Restrict to attachments created strictly after this instant.
    pub created_after: Option<DateTime<Utc>>,
}

impl AttachmentQuery {
    pub fn for_notes(note_ids: Vec<Uuid>) -> Self {
        Self {
            note_ids: Some(note_ids),
            created_after: None,
        }
    }

    pub fn created_after(after: DateTime<Utc>) -> Self {
        Self {
            note_ids: None,
            created_after: Some(after),
        }
    }
}

/// Typed operations against the remote sync service.
///
/// Uploads are upserts by id, so retrying a successful upload is safe;
/// uploading an empty set is a silent no-op.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Upsert encrypted note rows by id.
    async fn upload_notes(&self, rows: &[RemoteNote]) -> Result<()>;

    /// Upsert encrypted folder rows by id.
    async fn upload_folders(&self, rows: &[RemoteFolder]) -> Result<()>;

    /// Upsert encrypted attachment rows by id.
    async fn upload_attachments(&self, rows: &[RemoteAttachment]) -> Result<()>;

    /// Fetch notes updated strictly after the given instant (all notes when
    /// `None`), newest first.
    async fn download_notes(
        &self,
        updated_after: Option<DateTime<Utc>>,
    ) -> Result<Vec<RemoteNote>>;

    /// Fetch every folder row. Folders are low-cardinality; no incremental
    /// filter is applied.
    async fn download_folders(&self) -> Result<Vec<RemoteFolder>>;

    /// Fetch attachments matching the query.
    async fn download_attachments(&self, query: AttachmentQuery) -> Result<Vec<RemoteAttachment>>;

    /// Upsert audit-log entries by derived id.
    async fn upsert_sync_log(&self, entries: &[SyncLogEntry]) -> Result<()>;
}

// =============================================================================
// CONNECTIVITY
// =============================================================================

/// Reachability probe consulted before any sync pass.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// True when the remote service is believed reachable.
    async fn is_online(&self) -> bool;
}

/// Settable connectivity flag for tests and embedded use.
#[derive(Debug, Default)]
pub struct StaticConnectivity {
    online: AtomicBool,
}

impl StaticConnectivity {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivity {
    async fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}
