//! Attachment repository implementation.
//!
//! Attachments are the denormalized half of the note/attachment pair: every
//! write here also recomputes the owning note's attachment-id list inside
//! the same transaction, so the list and the rows can never be observed out
//! of step.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use jot_core::{Attachment, AttachmentPatch, AttachmentStore, Error, Result};

use crate::notes::refresh_attachment_list;
use crate::{fmt_ts, parse_id, parse_ts};

fn map_row_to_attachment(row: &SqliteRow) -> Result<Attachment> {
    let id: String = row.get("id");
    let note_id: String = row.get("note_id");
    let kind: String = row.get("kind");
    let created_at: String = row.get("created_at");

    Ok(Attachment {
        id: parse_id(&id)?,
        note_id: parse_id(&note_id)?,
        kind: kind.parse().map_err(Error::Internal)?,
        blob: row.get("blob"),
        created_at: parse_ts(&created_at)?,
        dirty: row.get("dirty"),
    })
}

/// SQLite implementation of AttachmentStore.
#[derive(Debug, Clone)]
pub struct SqliteAttachments {
    pool: Pool<Sqlite>,
}

impl SqliteAttachments {
    /// Create a new SqliteAttachments with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Latest `created_at` across all local attachments, the high-water mark
    /// that bounds incremental attachment downloads. `None` when the table
    /// is empty.
    pub async fn latest_created_at(&self) -> Result<Option<DateTime<Utc>>> {
        let row = sqlx::query("SELECT MAX(created_at) AS high_water FROM attachments")
            .fetch_one(&self.pool)
            .await
            .map_err(Error::Database)?;

        let raw: Option<String> = row.get("high_water");
        raw.as_deref().map(parse_ts).transpose()
    }
}

#[async_trait]
impl AttachmentStore for SqliteAttachments {
    async fn list(&self) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, note_id, kind, blob, created_at, dirty
            FROM attachments
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_attachment).collect()
    }

    async fn list_dirty(&self) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, note_id, kind, blob, created_at, dirty
            FROM attachments
            WHERE dirty = 1
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_attachment).collect()
    }

    async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, note_id, kind, blob, created_at, dirty
            FROM attachments
            WHERE note_id = ?
            ORDER BY created_at, id
            "#,
        )
        .bind(note_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_attachment).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Attachment>> {
        let row = sqlx::query(
            "SELECT id, note_id, kind, blob, created_at, dirty FROM attachments WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(map_row_to_attachment).transpose()
    }

    async fn put(&self, attachment: &Attachment) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // A replaced row may have pointed at a different note; that note's
        // list needs recomputing too.
        let previous_owner = sqlx::query("SELECT note_id FROM attachments WHERE id = ?")
            .bind(attachment.id.to_string())
            .fetch_optional(&mut *tx)
            .await
            .map_err(Error::Database)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO attachments (id, note_id, kind, blob, created_at, dirty)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(attachment.id.to_string())
        .bind(attachment.note_id.to_string())
        .bind(attachment.kind.to_string())
        .bind(&attachment.blob)
        .bind(fmt_ts(attachment.created_at))
        .bind(attachment.dirty)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        refresh_attachment_list(&mut tx, attachment.note_id).await?;

        if let Some(row) = previous_owner {
            let raw: String = row.get("note_id");
            let previous = parse_id(&raw)?;
            if previous != attachment.note_id {
                refresh_attachment_list(&mut tx, previous).await?;
            }
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn update(&self, id: Uuid, patch: AttachmentPatch) -> Result<()> {
        let Some(current) = self.get(id).await? else {
            return Err(Error::NotFound(format!("Attachment {} not found", id)));
        };
        let Some(new_owner) = patch.note_id else {
            return Ok(());
        };
        if new_owner == current.note_id {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("UPDATE attachments SET note_id = ?, dirty = 1 WHERE id = ?")
            .bind(new_owner.to_string())
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        refresh_attachment_list(&mut tx, current.note_id).await?;
        refresh_attachment_list(&mut tx, new_owner).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let Some(current) = self.get(id).await? else {
            return Ok(());
        };

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        refresh_attachment_list(&mut tx, current.note_id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_dirty(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE attachments SET dirty = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Attachment {} not found", id)));
        }
        Ok(())
    }

    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!(
            "UPDATE attachments SET dirty = 0 WHERE id IN ({})",
            placeholders
        );

        let mut q = sqlx::query(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }
        q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }
}
