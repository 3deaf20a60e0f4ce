use super::{
    is_unique_violation, last_insert_id, map_sqlx_error, parse_optional_timestamp,
    parse_timestamp, to_unsigned,
};
use async_trait::async_trait;
use parcel_core::error::Result;
use parcel_core::{
    CodeLookup, LinkId, LinkRepository, NewLink, OwnerId, ShortCode, ShortLink, StorageError,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

/// The short link table in MySQL.
#[derive(Debug, Clone)]
pub struct MySqlLinkRepository {
    pool: MySqlPool,
}

impl MySqlLinkRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn link_from_row(row: &MySqlRow) -> Result<ShortLink> {
    let id: i64 = row.try_get("id").map_err(map_sqlx_error)?;
    let owner: Option<i64> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let clicks: i64 = row.try_get("click_count").map_err(map_sqlx_error)?;
    let expires_at: Option<i64> = row.try_get("expires_at").map_err(map_sqlx_error)?;
    let created_at: i64 = row.try_get("created_at").map_err(map_sqlx_error)?;

    Ok(ShortLink {
        id: LinkId(id),
        owner: owner.map(OwnerId),
        code: ShortCode::new(code).map_err(|e| StorageError::InvalidData(e.to_string()))?,
        target_url: row.try_get("target_url").map_err(map_sqlx_error)?,
        click_count: to_unsigned("click_count", clicks)?,
        expires_at: parse_optional_timestamp("expires_at", expires_at)?,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

#[async_trait]
impl CodeLookup for MySqlLinkRepository {
    async fn code_exists(&self, code: &ShortCode) -> Result<bool> {
        let exists = sqlx::query("SELECT 1 FROM short_links WHERE short_code = ? LIMIT 1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }
}

#[async_trait]
impl LinkRepository for MySqlLinkRepository {
    async fn insert(&self, link: NewLink) -> Result<ShortLink> {
        let result = sqlx::query(
            r#"
            INSERT INTO short_links (owner_id, short_code, target_url, click_count, expires_at, created_at)
            VALUES (?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(link.owner.map(OwnerId::get))
        .bind(link.code.as_str())
        .bind(link.target_url.as_str())
        .bind(link.expires_at.map(|ts| ts.as_second()))
        .bind(link.created_at.as_second())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                let id = last_insert_id(done.last_insert_id())?;
                Ok(link.into_link(LinkId(id)))
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::Conflict(link.code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn get(&self, id: LinkId) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, short_code, target_url, click_count, expires_at, created_at
            FROM short_links
            WHERE id = ?
            LIMIT 1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>> {
        let row = sqlx::query(
            r#"
            SELECT id, owner_id, short_code, target_url, click_count, expires_at, created_at
            FROM short_links
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(link_from_row).transpose()
    }

    async fn delete(&self, id: LinkId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM short_links WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_clicks(&self, id: LinkId) -> Result<()> {
        let result = sqlx::query("UPDATE short_links SET click_count = click_count + 1 WHERE id = ?")
            .bind(id.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("link {id}")));
        }
        Ok(())
    }
}
