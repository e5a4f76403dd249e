//! Note repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, Transaction};
use uuid::Uuid;

use jot_core::{Error, Note, NotePatch, NoteStore, Result};

use crate::{fmt_ts, parse_id, parse_ts};

/// Recompute a note's attachment-id list from the attachment rows that
/// reference it, within the caller's transaction. Every attachment write
/// path runs this so the two tables never drift apart.
pub(crate) async fn refresh_attachment_list(
    tx: &mut Transaction<'_, Sqlite>,
    note_id: Uuid,
) -> Result<()> {
    let rows = sqlx::query("SELECT id FROM attachments WHERE note_id = ? ORDER BY created_at, id")
        .bind(note_id.to_string())
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

    let mut ids = Vec::with_capacity(rows.len());
    for row in &rows {
        let raw: String = row.get("id");
        ids.push(parse_id(&raw)?);
    }

    sqlx::query("UPDATE notes SET attachment_ids = ? WHERE id = ?")
        .bind(serde_json::to_string(&ids)?)
        .bind(note_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(())
}

fn map_row_to_note(row: &SqliteRow) -> Result<Note> {
    let id: String = row.get("id");
    let folder_id: Option<String> = row.get("folder_id");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");
    let attachment_ids: String = row.get("attachment_ids");

    Ok(Note {
        id: parse_id(&id)?,
        encrypted_title: row.get("encrypted_title"),
        encrypted_content: row.get("encrypted_content"),
        folder_id: folder_id.as_deref().map(parse_id).transpose()?,
        pinned: row.get("pinned"),
        starred: row.get("starred"),
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
        attachment_ids: serde_json::from_str(&attachment_ids)?,
        dirty: row.get("dirty"),
    })
}

/// SQLite implementation of NoteStore.
#[derive(Debug, Clone)]
pub struct SqliteNotes {
    pool: Pool<Sqlite>,
}

impl SqliteNotes {
    /// Create a new SqliteNotes with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM notes WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.is_some())
    }

    /// Latest `updated_at` across all local notes, the high-water mark that
    /// bounds incremental note downloads. `None` when the table is empty.
    pub async fn latest_updated_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(updated_at) AS high_water FROM notes")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let raw: Option<String> = row.get("high_water");
        raw.as_deref().map(parse_ts).transpose()
    }
}

#[async_trait]
impl NoteStore for SqliteNotes {
    async fn list(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, encrypted_title, encrypted_content, folder_id, pinned, starred,
                   created_at, updated_at, attachment_ids, dirty
            FROM notes
            ORDER BY updated_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_note).collect()
    }

    async fn list_dirty(&self) -> Result<Vec<Note>> {
        let rows = sqlx::query(
            r#"
            SELECT id, encrypted_title, encrypted_content, folder_id, pinned, starred,
                   created_at, updated_at, attachment_ids, dirty
            FROM notes
            WHERE dirty = 1
            ORDER BY updated_at DESC, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_note).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(
            r#"
            SELECT id, encrypted_title, encrypted_content, folder_id, pinned, starred,
                   created_at, updated_at, attachment_ids, dirty
            FROM notes
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_row_to_note).transpose()
    }

    async fn put(&self, note: &Note) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // attachment_ids is derived below, not taken from the value, so a
        // remote merge can never detach locally known attachments.
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO notes
                (id, encrypted_title, encrypted_content, folder_id, pinned, starred,
                 created_at, updated_at, attachment_ids, dirty)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, '[]', ?)
            "#,
        )
        .bind(note.id.to_string())
        .bind(&note.encrypted_title)
        .bind(&note.encrypted_content)
        .bind(note.folder_id.map(|id| id.to_string()))
        .bind(note.pinned)
        .bind(note.starred)
        .bind(fmt_ts(note.created_at))
        .bind(fmt_ts(note.updated_at))
        .bind(note.dirty)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        refresh_attachment_list(&mut tx, note.id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: NotePatch) -> Result<()> {
        if !self.exists(id).await? {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }

        // Scalar MAX keeps updated_at monotonic even if the wall clock
        // stepped backwards since the last write.
        let mut updates: Vec<&str> = vec!["updated_at = MAX(updated_at, ?)", "dirty = 1"];

        if patch.encrypted_title.is_some() {
            updates.push("encrypted_title = ?");
        }
        if patch.encrypted_content.is_some() {
            updates.push("encrypted_content = ?");
        }
        if patch.folder_id.is_some() {
            updates.push("folder_id = ?");
        }
        if patch.pinned.is_some() {
            updates.push("pinned = ?");
        }
        if patch.starred.is_some() {
            updates.push("starred = ?");
        }

        let query = format!("UPDATE notes SET {} WHERE id = ?", updates.join(", "));

        let mut q = sqlx::query(&query).bind(fmt_ts(Utc::now()));
        if let Some(title) = patch.encrypted_title {
            q = q.bind(title);
        }
        if let Some(content) = patch.encrypted_content {
            q = q.bind(content);
        }
        if let Some(folder_id) = patch.folder_id {
            q = q.bind(folder_id.map(|f| f.to_string()));
        }
        if let Some(pinned) = patch.pinned {
            q = q.bind(pinned);
        }
        if let Some(starred) = patch.starred {
            q = q.bind(starred);
        }
        q = q.bind(id.to_string());

        q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Attachments belong to exactly one note and die with it.
        sqlx::query("DELETE FROM attachments WHERE note_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_dirty(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE notes SET dirty = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Note {} not found", id)));
        }
        Ok(())
    }

    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("UPDATE notes SET dirty = 0 WHERE id IN ({})", placeholders);

        let mut q = sqlx::query(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }
        q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }
}
