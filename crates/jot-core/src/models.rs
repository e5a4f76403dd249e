//! Core data models for the jot sync core.
//!
//! Every payload field holding user content is an opaque ciphertext value
//! produced by the encryption layer; only structural fields (ids, timestamps,
//! flags, relations) are plaintext. Each entity has a local record and a
//! remote wire record with an explicit mapping function in each direction.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Current instant truncated to microseconds, the finest precision that
/// survives a round trip through every store in the pipeline.
pub(crate) fn now_micros() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A note as stored locally.
///
/// `attachment_ids` is derived data: every write path recomputes it from the
/// attachment rows referencing this note, so it always reflects the current
/// attachment set in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub encrypted_title: String,
    pub encrypted_content: String,
    pub folder_id: Option<Uuid>,
    pub pinned: bool,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub attachment_ids: Vec<Uuid>,
    pub dirty: bool,
}

impl Note {
    /// Create a new local note pending upload.
    pub fn new(
        encrypted_title: String,
        encrypted_content: String,
        folder_id: Option<Uuid>,
    ) -> Self {
        let now = now_micros();
        Self {
            id: Uuid::new_v4(),
            encrypted_title,
            encrypted_content,
            folder_id,
            pinned: false,
            starred: false,
            created_at: now,
            updated_at: now,
            attachment_ids: Vec::new(),
            dirty: true,
        }
    }

    /// Map to the remote wire record (structural remap only, no
    /// re-encryption). The attachment-id list is local denormalization and
    /// does not travel.
    pub fn to_remote(&self) -> RemoteNote {
        RemoteNote {
            id: self.id,
            encrypted_title: self.encrypted_title.clone(),
            encrypted_content: self.encrypted_content.clone(),
            folder_id: self.folder_id,
            pinned: self.pinned,
            starred: self.starred,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Map a remote wire record to a local record. Remote-sourced rows are
    /// clean by definition; the attachment-id list is recomputed when the
    /// row is written to the local store.
    pub fn from_remote(remote: RemoteNote) -> Self {
        Self {
            id: remote.id,
            encrypted_title: remote.encrypted_title,
            encrypted_content: remote.encrypted_content,
            folder_id: remote.folder_id,
            pinned: remote.pinned,
            starred: remote.starred,
            created_at: remote.created_at,
            updated_at: remote.updated_at,
            attachment_ids: Vec::new(),
            dirty: false,
        }
    }
}

/// Targeted note mutation applied by the local store.
///
/// `folder_id` is doubly optional: `None` leaves the folder untouched,
/// `Some(None)` re-files the note to no folder.
#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub encrypted_title: Option<String>,
    pub encrypted_content: Option<String>,
    pub folder_id: Option<Option<Uuid>>,
    pub pinned: Option<bool>,
    pub starred: Option<bool>,
}

/// A note row on the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteNote {
    pub id: Uuid,
    pub encrypted_title: String,
    pub encrypted_content: String,
    pub folder_id: Option<Uuid>,
    pub pinned: bool,
    pub starred: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// FOLDER TYPES
// =============================================================================

/// A folder as stored locally. Folders track no update timestamp; their
/// creation timestamp is the conflict-resolution field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Folder {
    pub id: Uuid,
    pub encrypted_name: String,
    pub created_at: DateTime<Utc>,
    pub dirty: bool,
}

impl Folder {
    /// Create a new local folder pending upload.
    pub fn new(encrypted_name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            encrypted_name,
            created_at: now_micros(),
            dirty: true,
        }
    }

    pub fn to_remote(&self) -> RemoteFolder {
        RemoteFolder {
            id: self.id,
            encrypted_name: self.encrypted_name.clone(),
            created_at: self.created_at,
        }
    }

    pub fn from_remote(remote: RemoteFolder) -> Self {
        Self {
            id: remote.id,
            encrypted_name: remote.encrypted_name,
            created_at: remote.created_at,
            dirty: false,
        }
    }
}

/// Targeted folder mutation applied by the local store.
#[derive(Debug, Clone, Default)]
pub struct FolderPatch {
    pub encrypted_name: Option<String>,
}

/// A folder row on the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFolder {
    pub id: Uuid,
    pub encrypted_name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// ATTACHMENT TYPES
// =============================================================================

/// Media kind of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Audio,
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image => write!(f, "image"),
            Self::Audio => write!(f, "audio"),
        }
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "audio" => Ok(Self::Audio),
            _ => Err(format!("Invalid attachment kind: {}", s)),
        }
    }
}

/// An attachment as stored locally. The blob is IV-prefixed ciphertext;
/// an attachment belongs to exactly one note and is deleted with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub kind: AttachmentKind,
    pub blob: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub dirty: bool,
}

impl Attachment {
    /// Create a new local attachment pending upload.
    pub fn new(note_id: Uuid, kind: AttachmentKind, blob: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            note_id,
            kind,
            blob,
            created_at: now_micros(),
            dirty: true,
        }
    }

    /// Map to the remote wire record. The ciphertext blob travels base64
    /// encoded inside the JSON body.
    pub fn to_remote(&self) -> RemoteAttachment {
        RemoteAttachment {
            id: self.id,
            note_id: self.note_id,
            kind: self.kind,
            encrypted_blob: STANDARD.encode(&self.blob),
            created_at: self.created_at,
        }
    }

    /// Map a remote wire record to a local record, decoding the base64
    /// blob. Fails if the remote row carries a malformed payload.
    pub fn from_remote(remote: RemoteAttachment) -> Result<Self> {
        let blob = STANDARD
            .decode(&remote.encrypted_blob)
            .map_err(|e| Error::Serialization(format!("attachment blob is not base64: {}", e)))?;
        Ok(Self {
            id: remote.id,
            note_id: remote.note_id,
            kind: remote.kind,
            blob,
            created_at: remote.created_at,
            dirty: false,
        })
    }
}

/// Targeted attachment mutation applied by the local store (re-parenting
/// to another note).
#[derive(Debug, Clone, Default)]
pub struct AttachmentPatch {
    pub note_id: Option<Uuid>,
}

/// An attachment row on the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAttachment {
    pub id: Uuid,
    pub note_id: Uuid,
    pub kind: AttachmentKind,
    pub encrypted_blob: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// SYNC LOG TYPES
// =============================================================================

/// Entity discriminator used by the sync audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Note,
    Folder,
    Attachment,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Note => write!(f, "note"),
            Self::Folder => write!(f, "folder"),
            Self::Attachment => write!(f, "attachment"),
        }
    }
}

/// One audit-log row per (entity type, entity id), overwritten each time a
/// reconciliation touches that entity. An audit trail, not a correctness
/// dependency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncLogEntry {
    pub id: String,
    pub item_type: EntityKind,
    pub item_id: Uuid,
    pub last_synced_at: DateTime<Utc>,
}

impl SyncLogEntry {
    /// Build the entry for an entity touched at `at`. The row id is derived
    /// as `{kind}-{entity id}` so retries overwrite rather than accumulate.
    pub fn new(item_type: EntityKind, item_id: Uuid, at: DateTime<Utc>) -> Self {
        Self {
            id: format!("{}-{}", item_type, item_id),
            item_type,
            item_id,
            last_synced_at: at,
        }
    }
}

// =============================================================================
// SYNC STATUS TYPES
// =============================================================================

/// Externally observable engine state, derived from the status flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Idle,
    Syncing,
    Offline,
    Error,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Syncing => write!(f, "syncing"),
            Self::Offline => write!(f, "offline"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Whole-value sync status. The engine replaces the entire value on every
/// transition; observers never see partial updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_syncing: bool,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub offline: bool,
}

impl SyncStatus {
    /// Derive the observable state. Offline dominates; an error is only
    /// reported once the engine has left `syncing`.
    pub fn state(&self) -> SyncState {
        if self.offline {
            SyncState::Offline
        } else if self.is_syncing {
            SyncState::Syncing
        } else if self.last_error.is_some() {
            SyncState::Error
        } else {
            SyncState::Idle
        }
    }
}
