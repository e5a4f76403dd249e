//! Contract tests for the remote store as the sync engine consumes it.
//!
//! This test suite validates:
//! - The in-memory remote behaves correctly behind `Arc<dyn RemoteStore>`,
//!   the shape the engine holds
//! - A retained concrete clone observes state written through the trait,
//!   and seeding helpers stay out of the call log
//! - Injected failures surface as `Error::Remote` and clear cleanly
//! - Audit-log ids keep entity kinds apart while collapsing retries

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use jot_core::{
    Attachment, AttachmentKind, AttachmentQuery, EntityKind, Error, Folder, Note, RemoteStore,
    SyncLogEntry,
};
use jot_remote::MemoryRemote;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn ts(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 8, minute, 0).unwrap()
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_round_trip_through_the_engine_facing_trait() {
    let memory = MemoryRemote::new();
    let remote: Arc<dyn RemoteStore> = Arc::new(memory.clone());

    let note = Note::new("enc-title".into(), "enc-content".into(), None).to_remote();
    let folder = Folder::new("enc-name".into()).to_remote();
    let attachment = Attachment::new(note.id, AttachmentKind::Image, vec![7, 7]).to_remote();

    remote.upload_notes(&[note.clone()]).await.unwrap();
    remote.upload_folders(&[folder.clone()]).await.unwrap();
    remote.upload_attachments(&[attachment.clone()]).await.unwrap();

    // The retained clone shares state with the trait object.
    assert_eq!(memory.note(note.id).unwrap().encrypted_title, "enc-title");
    assert_eq!(memory.folder(folder.id).unwrap().encrypted_name, "enc-name");
    assert_eq!(memory.attachment(attachment.id).unwrap().note_id, note.id);

    let notes = remote.download_notes(None).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].encrypted_content, "enc-content");

    let attachments = remote
        .download_attachments(AttachmentQuery::for_notes(vec![note.id]))
        .await
        .unwrap();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].encrypted_blob, attachment.encrypted_blob);
}

#[tokio::test]
async fn test_seeding_helpers_stay_out_of_the_call_log() {
    let memory = MemoryRemote::new();
    let remote: Arc<dyn RemoteStore> = Arc::new(memory.clone());

    let note = Note::new("t".into(), "c".into(), None);
    memory.insert_note(note.to_remote());
    memory.insert_folder(Folder::new("f".into()).to_remote());

    remote.download_notes(None).await.unwrap();
    remote.download_folders().await.unwrap();

    // Only the trait-driven operations show up.
    assert_eq!(memory.calls(), vec!["download_notes", "download_folders"]);
}

#[tokio::test]
async fn test_injected_failure_surfaces_remote_error() {
    let memory = MemoryRemote::new();
    let remote: Arc<dyn RemoteStore> = Arc::new(memory.clone());
    memory.set_failing("download_notes", true);

    let err = remote.download_notes(None).await.unwrap_err();
    assert!(matches!(err, Error::Remote(_)));

    // A partial outage leaves the other operations untouched.
    let note = Note::new("t".into(), "c".into(), None).to_remote();
    remote.upload_notes(&[note]).await.unwrap();
    remote.download_folders().await.unwrap();

    memory.set_failing("download_notes", false);
    assert_eq!(remote.download_notes(None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_audit_ids_separate_kinds_and_collapse_retries() {
    let memory = MemoryRemote::new();
    let remote: Arc<dyn RemoteStore> = Arc::new(memory.clone());
    let shared_id = Uuid::new_v4();

    remote
        .upsert_sync_log(&[
            SyncLogEntry::new(EntityKind::Note, shared_id, ts(0)),
            SyncLogEntry::new(EntityKind::Folder, shared_id, ts(0)),
        ])
        .await
        .unwrap();

    // A later pass touching the same note overwrites its entry only.
    remote
        .upsert_sync_log(&[SyncLogEntry::new(EntityKind::Note, shared_id, ts(5))])
        .await
        .unwrap();

    let mut entries = memory.sync_log();
    entries.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, format!("folder-{}", shared_id));
    assert_eq!(entries[0].last_synced_at, ts(0));
    assert_eq!(entries[1].id, format!("note-{}", shared_id));
    assert_eq!(entries[1].last_synced_at, ts(5));
}

#[tokio::test]
async fn test_created_after_query_spans_notes_and_is_strict() {
    let memory = MemoryRemote::new();
    let remote: Arc<dyn RemoteStore> = Arc::new(memory.clone());

    let mut at_cutoff = Attachment::new(Uuid::new_v4(), AttachmentKind::Image, vec![1]);
    at_cutoff.created_at = ts(3);
    let mut newer = Attachment::new(Uuid::new_v4(), AttachmentKind::Audio, vec![2]);
    newer.created_at = ts(4);
    memory.insert_attachment(at_cutoff.to_remote());
    memory.insert_attachment(newer.to_remote());

    let rows = remote
        .download_attachments(AttachmentQuery::created_after(ts(3)))
        .await
        .unwrap();

    // Strictly greater, regardless of owning note.
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, newer.id);
}
