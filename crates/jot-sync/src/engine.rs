//! Sync engine: bidirectional reconciliation between the local store and the
//! remote service.
//!
//! `sync_out` uploads dirty rows and clears their flags once the upload is
//! confirmed. `sync_in` pulls rows newer than the local high-water marks and
//! applies last-write-wins per row. `full_sync` runs both, converts every
//! failure into a status update instead of an error, and coalesces
//! concurrent triggers onto the pass already in flight.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use jot_core::{
    Attachment, AttachmentQuery, AttachmentStore, ConnectivityProbe, EntityKind, Error, Folder,
    FolderStore, Note, NoteStore, RemoteAttachment, RemoteFolder, RemoteNote, RemoteStore, Result,
    SyncLogEntry,
};
use jot_store::LocalStore;

use crate::status::StatusBus;

/// Per-table row counts for one direction of a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncCounts {
    pub notes: usize,
    pub folders: usize,
    pub attachments: usize,
}

impl SyncCounts {
    pub fn total(&self) -> usize {
        self.notes + self.folders + self.attachments
    }
}

/// What one `full_sync` pass did. Triggers never receive an `Err`; failures
/// land in `error` and in the shared status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded: SyncCounts,
    pub merged: SyncCounts,
    pub error: Option<String>,
    pub offline: bool,
}

type InFlight = Shared<BoxFuture<'static, SyncReport>>;

/// Orchestrates reconciliation passes. Cheap to clone; clones share the
/// status bus and the in-flight guard.
#[derive(Clone)]
pub struct SyncEngine {
    store: LocalStore,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn ConnectivityProbe>,
    status: StatusBus,
    in_flight: Arc<Mutex<Option<InFlight>>>,
}

impl SyncEngine {
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteStore>,
        connectivity: Arc<dyn ConnectivityProbe>,
    ) -> Self {
        Self {
            store,
            remote,
            connectivity,
            status: StatusBus::new(),
            in_flight: Arc::new(Mutex::new(None)),
        }
    }

    /// Status bus, for reading the current state or subscribing.
    pub fn status(&self) -> &StatusBus {
        &self.status
    }

    /// Consult the connectivity probe.
    pub async fn is_online(&self) -> bool {
        self.connectivity.is_online().await
    }

    /// Upload every dirty row, table by table. Fails as a whole on the first
    /// upload error; tables already pushed stay confirmed.
    pub async fn sync_out(&self) -> Result<SyncCounts> {
        if !self.connectivity.is_online().await {
            return Err(Error::Offline);
        }
        let at = Utc::now();

        let notes = self.push_notes(at).await?;
        let folders = self.push_folders(at).await?;
        let attachments = self.push_attachments(at).await?;

        let counts = SyncCounts {
            notes,
            folders,
            attachments,
        };
        if counts.total() > 0 {
            debug!(
                subsystem = "sync",
                op = "sync_out",
                notes = counts.notes,
                folders = counts.folders,
                attachments = counts.attachments,
                "Uploaded dirty rows"
            );
        }
        Ok(counts)
    }

    /// Download rows newer than the local high-water marks and merge them
    /// with last-write-wins. Row writes are not rolled back across entity
    /// types when a later fetch fails.
    pub async fn sync_in(&self) -> Result<SyncCounts> {
        if !self.connectivity.is_online().await {
            return Err(Error::Offline);
        }
        let at = Utc::now();

        let (notes, fetched_note_ids) = self.pull_notes(at).await?;
        let folders = self.pull_folders(at).await?;
        let attachments = self.pull_attachments(at, fetched_note_ids).await?;

        let counts = SyncCounts {
            notes,
            folders,
            attachments,
        };
        if counts.total() > 0 {
            debug!(
                subsystem = "sync",
                op = "sync_in",
                notes = counts.notes,
                folders = counts.folders,
                attachments = counts.attachments,
                "Merged remote rows"
            );
        }
        Ok(counts)
    }

    /// Run a full pass: upload, then download, so fresh local state is on
    /// the remote before remote state is pulled. Concurrent callers while a
    /// pass is running all receive the completion of that pass.
    pub async fn full_sync(&self) -> SyncReport {
        self.in_flight_handle().await.await
    }

    /// Return the running pass, or start one. The slot is cleared by the
    /// pass itself; a completed handle still in the slot is stale.
    async fn in_flight_handle(&self) -> InFlight {
        let mut slot = self.in_flight.lock().await;
        if let Some(running) = slot.as_ref() {
            if running.peek().is_none() {
                return running.clone();
            }
        }

        let engine = self.clone();
        let task = tokio::spawn(async move {
            let report = engine.run_once().await;
            engine.in_flight.lock().await.take();
            report
        });

        let status = self.status.clone();
        let shared: InFlight = async move {
            match task.await {
                Ok(report) => report,
                Err(e) => {
                    error!(subsystem = "sync", error = ?e, "Sync task panicked");
                    let message = format!("Sync task failed: {}", e);
                    status.fail(Utc::now(), message.clone());
                    SyncReport {
                        error: Some(message),
                        ..SyncReport::default()
                    }
                }
            }
        }
        .boxed()
        .shared();
        *slot = Some(shared.clone());
        shared
    }

    /// One uncoalesced pass with its status transitions.
    async fn run_once(&self) -> SyncReport {
        let start = Instant::now();
        self.status.begin();

        let mut report = SyncReport::default();
        let outcome = async {
            report.uploaded = self.sync_out().await?;
            report.merged = self.sync_in().await?;
            Ok(())
        }
        .await;

        match outcome {
            Ok(()) => {
                self.status.succeed(Utc::now());
                info!(
                    subsystem = "sync",
                    op = "full_sync",
                    uploaded = report.uploaded.total(),
                    merged = report.merged.total(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Sync pass complete"
                );
            }
            Err(Error::Offline) => {
                report.offline = true;
                self.status.go_offline();
                debug!(
                    subsystem = "sync",
                    op = "full_sync",
                    "Sync pass skipped while offline"
                );
            }
            Err(e) => {
                let message = e.to_string();
                report.error = Some(message.clone());
                self.status.fail(Utc::now(), message);
                warn!(
                    subsystem = "sync",
                    op = "full_sync",
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Sync pass failed"
                );
            }
        }
        report
    }

    async fn push_notes(&self, at: DateTime<Utc>) -> Result<usize> {
        let dirty = self.store.notes.list_dirty().await?;
        if dirty.is_empty() {
            return Ok(0);
        }
        let rows: Vec<RemoteNote> = dirty.iter().map(Note::to_remote).collect();
        self.remote.upload_notes(&rows).await?;

        // Clear only after the upload is confirmed; a crash in between
        // retries harmlessly against the idempotent upsert.
        let ids: Vec<Uuid> = dirty.iter().map(|n| n.id).collect();
        self.store.notes.clear_dirty(&ids).await?;
        self.append_log(EntityKind::Note, &ids, at).await?;
        Ok(ids.len())
    }

    async fn push_folders(&self, at: DateTime<Utc>) -> Result<usize> {
        let dirty = self.store.folders.list_dirty().await?;
        if dirty.is_empty() {
            return Ok(0);
        }
        let rows: Vec<RemoteFolder> = dirty.iter().map(Folder::to_remote).collect();
        self.remote.upload_folders(&rows).await?;

        let ids: Vec<Uuid> = dirty.iter().map(|f| f.id).collect();
        self.store.folders.clear_dirty(&ids).await?;
        self.append_log(EntityKind::Folder, &ids, at).await?;
        Ok(ids.len())
    }

    async fn push_attachments(&self, at: DateTime<Utc>) -> Result<usize> {
        let dirty = self.store.attachments.list_dirty().await?;
        if dirty.is_empty() {
            return Ok(0);
        }
        let rows: Vec<RemoteAttachment> = dirty.iter().map(Attachment::to_remote).collect();
        self.remote.upload_attachments(&rows).await?;

        let ids: Vec<Uuid> = dirty.iter().map(|a| a.id).collect();
        self.store.attachments.clear_dirty(&ids).await?;
        self.append_log(EntityKind::Attachment, &ids, at).await?;
        Ok(ids.len())
    }

    /// Merge remote notes newer than the local high-water mark. Returns the
    /// merged count and the ids of every fetched note, which scope the
    /// attachment download that follows.
    async fn pull_notes(&self, at: DateTime<Utc>) -> Result<(usize, Vec<Uuid>)> {
        let mark = self.store.notes.latest_updated_at().await?;
        let batch = self.remote.download_notes(mark).await?;
        let fetched: Vec<Uuid> = batch.iter().map(|r| r.id).collect();

        let mut written = Vec::new();
        for row in batch {
            let local = self.store.notes.get(row.id).await?;
            if local.map_or(true, |l| row.updated_at > l.updated_at) {
                written.push(row.id);
                self.store.notes.put(&Note::from_remote(row)).await?;
            }
        }
        self.append_log(EntityKind::Note, &written, at).await?;
        Ok((written.len(), fetched))
    }

    /// Folders are low-cardinality; the whole table is fetched every pass.
    async fn pull_folders(&self, at: DateTime<Utc>) -> Result<usize> {
        let batch = self.remote.download_folders().await?;

        let mut written = Vec::new();
        for row in batch {
            let local = self.store.folders.get(row.id).await?;
            if local.map_or(true, |l| row.created_at > l.created_at) {
                written.push(row.id);
                self.store.folders.put(&Folder::from_remote(row)).await?;
            }
        }
        self.append_log(EntityKind::Folder, &written, at).await?;
        Ok(written.len())
    }

    /// Merge attachments via two fetches: one scoped to the notes just
    /// fetched, one scoped past the local creation high-water mark. Either
    /// query alone can miss rows; the union is deduplicated by id, first
    /// occurrence wins.
    async fn pull_attachments(&self, at: DateTime<Utc>, note_ids: Vec<Uuid>) -> Result<usize> {
        let by_note = self
            .remote
            .download_attachments(AttachmentQuery::for_notes(note_ids))
            .await?;
        let query = match self.store.attachments.latest_created_at().await? {
            Some(mark) => AttachmentQuery::created_after(mark),
            None => AttachmentQuery::default(),
        };
        let by_time = self.remote.download_attachments(query).await?;

        let mut seen = HashSet::new();
        let mut written = Vec::new();
        for row in by_note.into_iter().chain(by_time) {
            if !seen.insert(row.id) {
                continue;
            }
            let local = self.store.attachments.get(row.id).await?;
            if local.map_or(true, |l| row.created_at > l.created_at) {
                written.push(row.id);
                self.store
                    .attachments
                    .put(&Attachment::from_remote(row)?)
                    .await?;
            }
        }
        self.append_log(EntityKind::Attachment, &written, at).await?;
        Ok(written.len())
    }

    /// One audit row per touched entity, keyed so retries overwrite.
    async fn append_log(&self, kind: EntityKind, ids: &[Uuid], at: DateTime<Utc>) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let entries: Vec<SyncLogEntry> = ids
            .iter()
            .map(|&id| SyncLogEntry::new(kind, id, at))
            .collect();
        self.remote.upsert_sync_log(&entries).await
    }
}
