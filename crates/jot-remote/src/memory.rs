//! In-memory remote store for tests and offline development.
//!
//! Behaves like the HTTP adapter against a live service, with three extra
//! knobs: a call log for asserting which operations ran, per-operation
//! failure injection, and simulated latency.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use jot_core::{
    AttachmentQuery, Error, RemoteAttachment, RemoteFolder, RemoteNote, RemoteStore, Result,
    SyncLogEntry,
};

#[derive(Default)]
struct MemoryState {
    notes: HashMap<Uuid, RemoteNote>,
    folders: HashMap<Uuid, RemoteFolder>,
    attachments: HashMap<Uuid, RemoteAttachment>,
    sync_log: HashMap<String, SyncLogEntry>,
    calls: Vec<String>,
    fail_ops: HashSet<String>,
    latency_ms: u64,
}

/// In-memory remote store.
///
/// Clones share state, so a test can hold one handle for assertions while
/// the engine under test owns another.
#[derive(Clone, Default)]
pub struct MemoryRemote {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every operation by the given number of milliseconds.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.state.lock().unwrap().latency_ms = latency_ms;
        self
    }

    /// Make the named operation fail until cleared.
    pub fn set_failing(&self, op: &str, failing: bool) {
        let mut state = self.state.lock().unwrap();
        if failing {
            state.fail_ops.insert(op.to_string());
        } else {
            state.fail_ops.remove(op);
        }
    }

    /// All operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    /// How many times the named operation was invoked.
    pub fn call_count(&self, op: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Seed a note without touching the call log.
    pub fn insert_note(&self, row: RemoteNote) {
        self.state.lock().unwrap().notes.insert(row.id, row);
    }

    /// Seed a folder without touching the call log.
    pub fn insert_folder(&self, row: RemoteFolder) {
        self.state.lock().unwrap().folders.insert(row.id, row);
    }

    /// Seed an attachment without touching the call log.
    pub fn insert_attachment(&self, row: RemoteAttachment) {
        self.state.lock().unwrap().attachments.insert(row.id, row);
    }

    pub fn note(&self, id: Uuid) -> Option<RemoteNote> {
        self.state.lock().unwrap().notes.get(&id).cloned()
    }

    pub fn folder(&self, id: Uuid) -> Option<RemoteFolder> {
        self.state.lock().unwrap().folders.get(&id).cloned()
    }

    pub fn attachment(&self, id: Uuid) -> Option<RemoteAttachment> {
        self.state.lock().unwrap().attachments.get(&id).cloned()
    }

    /// All audit entries, unordered.
    pub fn sync_log(&self) -> Vec<SyncLogEntry> {
        self.state.lock().unwrap().sync_log.values().cloned().collect()
    }

    /// Record the call, wait out any configured latency, then fail if the
    /// operation is marked as failing.
    async fn enter(&self, op: &str) -> Result<()> {
        let (latency_ms, fail) = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(op.to_string());
            (state.latency_ms, state.fail_ops.contains(op))
        };
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
        if fail {
            return Err(Error::Remote(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn upload_notes(&self, rows: &[RemoteNote]) -> Result<()> {
        self.enter("upload_notes").await?;
        let mut state = self.state.lock().unwrap();
        for row in rows {
            state.notes.insert(row.id, row.clone());
        }
        Ok(())
    }

    async fn upload_folders(&self, rows: &[RemoteFolder]) -> Result<()> {
        self.enter("upload_folders").await?;
        let mut state = self.state.lock().unwrap();
        for row in rows {
            state.folders.insert(row.id, row.clone());
        }
        Ok(())
    }

    async fn upload_attachments(&self, rows: &[RemoteAttachment]) -> Result<()> {
        self.enter("upload_attachments").await?;
        let mut state = self.state.lock().unwrap();
        for row in rows {
            state.attachments.insert(row.id, row.clone());
        }
        Ok(())
    }

    async fn download_notes(&self, updated_after: Option<DateTime<Utc>>) -> Result<Vec<RemoteNote>> {
        self.enter("download_notes").await?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<RemoteNote> = state
            .notes
            .values()
            .filter(|n| updated_after.map_or(true, |after| n.updated_at > after))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rows)
    }

    async fn download_folders(&self) -> Result<Vec<RemoteFolder>> {
        self.enter("download_folders").await?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<RemoteFolder> = state.folders.values().cloned().collect();
        rows.sort_by_key(|f| f.created_at);
        Ok(rows)
    }

    async fn download_attachments(&self, query: AttachmentQuery) -> Result<Vec<RemoteAttachment>> {
        self.enter("download_attachments").await?;
        let state = self.state.lock().unwrap();
        let mut rows: Vec<RemoteAttachment> = state
            .attachments
            .values()
            .filter(|a| {
                query
                    .note_ids
                    .as_ref()
                    .map_or(true, |ids| ids.contains(&a.note_id))
            })
            .filter(|a| {
                query
                    .created_after
                    .map_or(true, |after| a.created_at > after)
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.created_at);
        Ok(rows)
    }

    async fn upsert_sync_log(&self, entries: &[SyncLogEntry]) -> Result<()> {
        self.enter("upsert_sync_log").await?;
        let mut state = self.state.lock().unwrap();
        for entry in entries {
            state.sync_log.insert(entry.id.clone(), entry.clone());
        }
        Ok(())
    }
}
