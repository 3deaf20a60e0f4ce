use super::{
    is_unique_violation, last_insert_id, map_sqlx_error, parse_optional_timestamp,
    parse_timestamp, to_signed, to_unsigned,
};
use async_trait::async_trait;
use jiff::Timestamp;
use parcel_core::error::Result;
use parcel_core::{
    AccessKind, BlobPath, CodeLookup, ContentId, ContentItem, ContentRepository, LiveUsage,
    NewContent, OwnerId, ShortCode, StorageError,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const COLUMNS: &str = "id, owner_id, short_code, file_name, content_type, size, storage_path, \
                       thumbnail_path, expires_at, max_views, view_count, download_count, created_at";

/// The content table in MySQL.
///
/// Rows are hard-deleted; a code becomes reusable once its row is gone.
#[derive(Debug, Clone)]
pub struct MySqlContentRepository {
    pool: MySqlPool,
}

impl MySqlContentRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn content_from_row(row: &MySqlRow) -> Result<ContentItem> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let owner: Option<i64> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let size: i64 = row.try_get("size").map_err(map_sqlx_error)?;
    let storage_path: String = row.try_get("storage_path").map_err(map_sqlx_error)?;
    let thumbnail_path: Option<String> = row.try_get("thumbnail_path").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let max_views: Option<i64> = row.try_get("max_views").map_err(map_sqlx_error)?;
    let view_count: i64 = row.try_get("view_count").map_err(map_sqlx_error)?;
    let download_count: i64 = row.try_get("download_count").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ContentItem {
        id: ContentId(id),
        owner: owner.map(OwnerId),
        code: ShortCode::new(code).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        file_name: row.try_get("file_name").map_err(map_sqlx_error)?,
        content_type: row.try_get("content_type").map_err(map_sqlx_error)?,
        size: to_unsigned("size", size)?,
        storage_path: BlobPath::new(storage_path),
        thumbnail_path: thumbnail_path.map(BlobPath::new),
        expires_at: parse_optional_timestamp("expires_at", expires_at)?,
        max_views: max_views.map(|v| to_unsigned("max_views", v)).transpose()?,
        view_count: to_unsigned("view_count", view_count)?,
        download_count: to_unsigned("download_count", download_count)?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

#[async_trait]
impl CodeLookup for MySqlContentRepository {
    async fn code_exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM contents WHERE short_code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl ContentRepository for MySqlContentRepository {
    async fn insert(&self, content: NewContent) -> Result<ContentItem> {
        let size = to_signed("size", content.size)?;
        let max_views = content
            .max_views
            .map(|v| to_signed("max_views", v))
            .transpose()?;

        let result = sqlx::query(
            r#"
            INSERT INTO contents (
                owner_id, short_code, file_name, content_type, size, storage_path,
                thumbnail_path, expires_at, max_views, view_count, download_count, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
            "#,
        )
        .bind(content.owner.map(OwnerId::get))
        .bind(content.code.as_str())
        .bind(content.file_name.as_str())
        .bind(content.content_type.as_deref())
        .bind(size)
        .bind(content.storage_path.as_str())
        .bind(content.thumbnail_path.as_ref().map(BlobPath::as_str))
        .bind(content.expires_at.map(|ts| ts.as_second()))
        .bind(max_views)
        .bind(content.created_at.as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = last_insert_id(done.last_insert_id())?;
                Ok(content.into_item(ContentId(id)))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(content.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>> {
        let row = sqlx::query(&format!("SELECT {COLUMNS} FROM contents WHERE id = ? LIMIT 1"))
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        row.as_ref().map(content_from_row).transpose()
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ContentItem>> {
        let row = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM contents WHERE short_code = ? LIMIT 1"
        ))
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(content_from_row).transpose()
    }

    async fn delete(&self, id: ContentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contents WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_counter(&self, id: ContentId, kind: AccessKind) -> Result<()> {
        let statement = match kind {
            AccessKind::View => "UPDATE contents SET view_count = view_count + 1 WHERE id = ?",
            AccessKind::Download => {
                "UPDATE contents SET download_count = download_count + 1 WHERE id = ?"
            }
            AccessKind::Click => return Ok(()),
        };

        let result = sqlx::query(statement)
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("content {id}")));
        }
        Ok(())
    }

    async fn find_reapable(&self, now: Timestamp) -> Result<Vec<ContentItem>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {COLUMNS}
            FROM contents
            WHERE (expires_at IS NOT NULL AND expires_at <= ?)
               OR (max_views IS NOT NULL AND view_count >= max_views)
            ORDER BY id
            "#
        ))
        .bind(now.as_second())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(content_from_row).collect()
    }

    async fn live_usage(&self, owner: OwnerId) -> Result<LiveUsage> {
        let row = sqlx::query(
            r#"
            SELECT CAST(COALESCE(SUM(size), 0) AS SIGNED) AS bytes, COUNT(*) AS files
            FROM contents
            WHERE owner_id = ?
            "#,
        )
        .bind(owner.get())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let bytes: i64 = row.try_get("bytes").map_err(map_sqlx_error)?;
        let files: i64 = row.try_get("files").map_err(map_sqlx_error)?;

        Ok(LiveUsage {
            bytes: to_unsigned("bytes", bytes)?,
            files: to_unsigned("files", files)?,
        })
    }

    async fn created_between(
        &self,
        owner: OwnerId,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Timestamp>> {
        let rows = sqlx::query(
            r#"
            SELECT created_at
            FROM contents
            WHERE owner_id = ?
              AND created_at >= ?
              AND created_at < ?
            "#,
        )
        .bind(owner.get())
        .bind(from.as_second())
        .bind(until.as_second())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                let seconds: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;
                parse_timestamp("created_at", seconds)
            })
            .collect()
    }
}
