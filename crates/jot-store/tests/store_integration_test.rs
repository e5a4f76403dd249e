//! Cross-repository integration tests for the local store.
//!
//! This test suite validates:
//! - Rows, dirty flags, and the derived attachment list survive a reopen of
//!   the same database file
//! - Folder deletion re-files notes inside one transaction
//! - Note deletion cascades to attachments without touching folders
//! - The dirty lifecycle across mutation, confirmation, and re-mutation

use jot_store::{
    Attachment, AttachmentKind, AttachmentStore, Folder, FolderStore, LocalStore, Note, NotePatch,
    NoteStore,
};

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

async fn seed(store: &LocalStore) -> (Folder, Note, Attachment) {
    let folder = Folder::new("enc-folder".into());
    store.folders.put(&folder).await.unwrap();

    let note = Note::new("enc-title".into(), "enc-content".into(), Some(folder.id));
    store.notes.put(&note).await.unwrap();

    let attachment = Attachment::new(note.id, AttachmentKind::Image, vec![0xAA, 0xBB]);
    store.attachments.put(&attachment).await.unwrap();

    (folder, note, attachment)
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_state_survives_reopen_of_the_same_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jot.db");

    let (folder, note, attachment) = {
        let store = LocalStore::connect(&path).await.unwrap();
        let seeded = seed(&store).await;
        // Confirm the note's upload but leave the others pending.
        store.notes.clear_dirty(&[seeded.1.id]).await.unwrap();
        seeded
    };

    let store = LocalStore::connect(&path).await.unwrap();

    let fetched_note = store.notes.get(note.id).await.unwrap().unwrap();
    assert!(!fetched_note.dirty);
    assert_eq!(fetched_note.folder_id, Some(folder.id));
    assert_eq!(fetched_note.attachment_ids, vec![attachment.id]);
    assert_eq!(fetched_note.encrypted_content, note.encrypted_content);

    assert!(store.folders.get(folder.id).await.unwrap().unwrap().dirty);
    let fetched_attachment = store.attachments.get(attachment.id).await.unwrap().unwrap();
    assert!(fetched_attachment.dirty);
    assert_eq!(fetched_attachment.blob, vec![0xAA, 0xBB]);
}

#[tokio::test]
async fn test_folder_deletion_refiles_without_touching_attachments() {
    let store = LocalStore::connect_memory().await.unwrap();
    let (folder, note, attachment) = seed(&store).await;
    store.notes.clear_dirty(&[note.id]).await.unwrap();

    store.folders.delete(folder.id).await.unwrap();

    let refiled = store.notes.get(note.id).await.unwrap().unwrap();
    assert_eq!(refiled.folder_id, None);
    assert!(refiled.dirty);
    assert_eq!(refiled.attachment_ids, vec![attachment.id]);
    assert!(store.attachments.get(attachment.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_note_deletion_cascades_to_attachments_only() {
    let store = LocalStore::connect_memory().await.unwrap();
    let (folder, note, attachment) = seed(&store).await;

    store.notes.delete(note.id).await.unwrap();

    assert!(store.notes.get(note.id).await.unwrap().is_none());
    assert!(store.attachments.get(attachment.id).await.unwrap().is_none());
    assert!(store.folders.get(folder.id).await.unwrap().is_some());
    assert!(store.attachments.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_dirty_lifecycle_through_mutation_and_confirmation() {
    let store = LocalStore::connect_memory().await.unwrap();
    let (_, note, attachment) = seed(&store).await;

    // Everything starts pending upload.
    assert_eq!(store.notes.list_dirty().await.unwrap().len(), 1);
    assert_eq!(store.folders.list_dirty().await.unwrap().len(), 1);
    assert_eq!(store.attachments.list_dirty().await.unwrap().len(), 1);

    // A sync pass confirms the current state.
    store.notes.clear_dirty(&[note.id]).await.unwrap();
    store.attachments.clear_dirty(&[attachment.id]).await.unwrap();
    assert!(store.notes.list_dirty().await.unwrap().is_empty());
    assert!(store.attachments.list_dirty().await.unwrap().is_empty());

    // The next edit re-enters the upload set.
    store
        .notes
        .update(
            note.id,
            NotePatch {
                pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let dirty = store.notes.list_dirty().await.unwrap();
    assert_eq!(dirty.len(), 1);
    assert!(dirty[0].pinned);
}
