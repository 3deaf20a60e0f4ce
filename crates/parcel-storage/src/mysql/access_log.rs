use super::{map_sqlx_error, parse_timestamp, truncated};
use async_trait::async_trait;
use jiff::Timestamp;
use parcel_core::error::Result;
use parcel_core::{
    AccessKind, AccessLogEntry, AccessLogStore, AccessTarget, ContentId, LinkId, LogScope,
    OwnerId, StorageError,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};

const MAX_IP_LEN: usize = 64;
const MAX_USER_AGENT_LEN: usize = 512;
const MAX_REFERRER_LEN: usize = 2048;

const CONTENT: &str = "content";
const LINK: &str = "link";

const BY_CONTENT: &str = r#"
    SELECT target_type, target_id, owner_id, kind, accessed_at, ip, user_agent, referrer
    FROM access_logs
    WHERE target_type = 'content' AND target_id = ?
      AND accessed_at >= ? AND accessed_at < ?
"#;

const BY_LINK: &str = r#"
    SELECT target_type, target_id, owner_id, kind, accessed_at, ip, user_agent, referrer
    FROM access_logs
    WHERE target_type = 'link' AND target_id = ?
      AND accessed_at >= ? AND accessed_at < ?
"#;

const BY_OWNER: &str = r#"
    SELECT target_type, target_id, owner_id, kind, accessed_at, ip, user_agent, referrer
    FROM access_logs
    WHERE owner_id = ?
      AND accessed_at >= ? AND accessed_at < ?
"#;

/// The access log in MySQL. Rows are never updated, only appended and
/// pruned.
#[derive(Debug, Clone)]
pub struct MySqlAccessLog {
    pool: MySqlPool,
}

impl MySqlAccessLog {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

fn target_columns(target: AccessTarget) -> (&'static str, i64) {
    match target {
        AccessTarget::Content(id) => (CONTENT, id.get()),
        AccessTarget::Link(id) => (LINK, id.get()),
    }
}

fn entry_from_row(row: &MySqlRow) -> Result<AccessLogEntry> {
    let target_type: String = row.try_get("target_type").map_err(map_sqlx_error)?;
    let target_id: i64 = row.try_get("target_id").map_err(map_sqlx_error)?;
    let owner: Option<i64> = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let kind: String = row.try_get("kind").map_err(map_sqlx_error)?;
    let accessed_at: i64 = row.try_get("accessed_at").map_err(map_sqlx_error)?;

    let target = match target_type.as_str() {
        CONTENT => AccessTarget::Content(ContentId(target_id)),
        LINK => AccessTarget::Link(LinkId(target_id)),
        other => {
            return Err(StorageError::InvalidData(format!(
                "unknown access target type '{other}'"
            )))
        }
    };
    let kind = AccessKind::parse(&kind)
        .ok_or_else(|| StorageError::InvalidData(format!("unknown access kind '{kind}'")))?;

    Ok(AccessLogEntry {
        target,
        owner: owner.map(OwnerId),
        kind,
        at: parse_timestamp("accessed_at", accessed_at)?,
        ip: row.try_get("ip").map_err(map_sqlx_error)?,
        user_agent: row.try_get("user_agent").map_err(map_sqlx_error)?,
        referrer: row.try_get("referrer").map_err(map_sqlx_error)?,
    })
}

#[async_trait]
impl AccessLogStore for MySqlAccessLog {
    async fn append(&self, entry: AccessLogEntry) -> Result<()> {
        let (target_type, target_id) = target_columns(entry.target);

        sqlx::query(
            r#"
            INSERT INTO access_logs (
                target_type, target_id, owner_id, kind, accessed_at, ip, user_agent, referrer
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(target_type)
        .bind(target_id)
        .bind(entry.owner.map(OwnerId::get))
        .bind(entry.kind.as_str())
        .bind(entry.at.as_second())
        .bind(truncated(entry.ip, MAX_IP_LEN))
        .bind(truncated(entry.user_agent, MAX_USER_AGENT_LEN))
        .bind(truncated(entry.referrer, MAX_REFERRER_LEN))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn query(
        &self,
        scope: LogScope,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<AccessLogEntry>> {
        let query = match scope {
            LogScope::Content(id) => sqlx::query(BY_CONTENT).bind(id.get()),
            LogScope::Link(id) => sqlx::query(BY_LINK).bind(id.get()),
            LogScope::Owner(owner) => sqlx::query(BY_OWNER).bind(owner.get()),
        };

        let rows = query
            .bind(from.as_second())
            .bind(until.as_second())
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter().map(entry_from_row).collect()
    }

    async fn prune_before(&self, cutoff: Timestamp) -> Result<u64> {
        let result = sqlx::query("DELETE FROM access_logs WHERE accessed_at < ?")
            .bind(cutoff.as_second())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
