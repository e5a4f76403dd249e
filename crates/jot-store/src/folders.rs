//! Folder repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use uuid::Uuid;

use jot_core::{Error, Folder, FolderPatch, FolderStore, Result};

use crate::{fmt_ts, parse_id, parse_ts};

fn map_row_to_folder(row: &SqliteRow) -> Result<Folder> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");

    Ok(Folder {
        id: parse_id(&id)?,
        encrypted_name: row.get("encrypted_name"),
        created_at: parse_ts(&created_at)?,
        dirty: row.get("dirty"),
    })
}

/// SQLite implementation of FolderStore.
#[derive(Debug, Clone)]
pub struct SqliteFolders {
    pool: Pool<Sqlite>,
}

impl SqliteFolders {
    /// Create a new SqliteFolders with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM folders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl FolderStore for SqliteFolders {
    async fn list(&self) -> Result<Vec<Folder>> {
        let rows = sqlx::query(
            "SELECT id, encrypted_name, created_at, dirty FROM folders ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_folder).collect()
    }

    async fn list_dirty(&self) -> Result<Vec<Folder>> {
        let rows = sqlx::query(
            r#"
            SELECT id, encrypted_name, created_at, dirty
            FROM folders
            WHERE dirty = 1
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(map_row_to_folder).collect()
    }

    async fn get(&self, id: Uuid) -> Result<Option<Folder>> {
        let row = sqlx::query("SELECT id, encrypted_name, created_at, dirty FROM folders WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.as_ref().map(map_row_to_folder).transpose()
    }

    async fn put(&self, folder: &Folder) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO folders (id, encrypted_name, created_at, dirty) VALUES (?, ?, ?, ?)",
        )
        .bind(folder.id.to_string())
        .bind(&folder.encrypted_name)
        .bind(fmt_ts(folder.created_at))
        .bind(folder.dirty)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }

    async fn update(&self, id: Uuid, patch: FolderPatch) -> Result<()> {
        if !self.exists(id).await? {
            return Err(Error::NotFound(format!("Folder {} not found", id)));
        }

        let mut updates: Vec<&str> = vec!["dirty = 1"];
        if patch.encrypted_name.is_some() {
            updates.push("encrypted_name = ?");
        }

        let query = format!("UPDATE folders SET {} WHERE id = ?", updates.join(", "));

        let mut q = sqlx::query(&query);
        if let Some(name) = patch.encrypted_name {
            q = q.bind(name);
        }
        q = q.bind(id.to_string());

        q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        // Re-file the folder's notes to no folder. The change is a local
        // mutation like any other, so it is marked for upload.
        sqlx::query(
            r#"
            UPDATE notes
            SET folder_id = NULL, dirty = 1, updated_at = MAX(updated_at, ?)
            WHERE folder_id = ?
            "#,
        )
        .bind(fmt_ts(Utc::now()))
        .bind(id.to_string())
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn mark_dirty(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("UPDATE folders SET dirty = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Folder {} not found", id)));
        }
        Ok(())
    }

    async fn clear_dirty(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let query = format!("UPDATE folders SET dirty = 0 WHERE id IN ({})", placeholders);

        let mut q = sqlx::query(&query);
        for id in ids {
            q = q.bind(id.to_string());
        }
        q.execute(&self.pool).await.map_err(Error::Database)?;
        Ok(())
    }
}
