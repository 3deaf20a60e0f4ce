use super::{map_sqlx_error, to_signed, to_unsigned};
use async_trait::async_trait;
use parcel_core::error::Result;
use parcel_core::{
    ChargeOutcome, Limits, LiveUsage, OwnerId, StorageError, UsageCounters, UsageDelta,
    UsageRepository,
};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::debug;

/// Retries when a conditional charge misses but a re-read says it fits,
/// which only happens when another writer moved the counters in between.
const CHARGE_ATTEMPTS: usize = 3;

/// Usage counters in MySQL.
///
/// Charges are a single conditional `UPDATE`, so the limit check and the
/// increment happen atomically inside the row lock.
#[derive(Debug, Clone)]
pub struct MySqlUsageRepository {
    pool: MySqlPool,
}

impl MySqlUsageRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, owner: OwnerId) -> Result<Option<UsageCounters>> {
        let row = sqlx::query(
            r#"
            SELECT owner_id, storage_used, file_count, max_storage, max_files
            FROM usage_counters
            WHERE owner_id = ?
            "#,
        )
        .bind(owner.get())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(counters_from_row).transpose()
    }

    async fn fetch_existing(&self, owner: OwnerId) -> Result<UsageCounters> {
        self.fetch(owner)
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("usage counters for owner {owner}")))
    }

    async fn create_if_missing(&self, owner: OwnerId) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO usage_counters (owner_id, storage_used, file_count)
            VALUES (?, 0, 0)
            ON DUPLICATE KEY UPDATE owner_id = owner_id
            "#,
        )
        .bind(owner.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

fn counters_from_row(row: &MySqlRow) -> Result<UsageCounters> {
    let owner: i64 = row.try_get("owner_id").map_err(map_sqlx_error)?;
    let storage_used: i64 = row.try_get("storage_used").map_err(map_sqlx_error)?;
    let file_count: i64 = row.try_get("file_count").map_err(map_sqlx_error)?;
    let max_storage: Option<i64> = row.try_get("max_storage").map_err(map_sqlx_error)?;
    let max_files: Option<i64> = row.try_get("max_files").map_err(map_sqlx_error)?;

    Ok(UsageCounters {
        owner: OwnerId(owner),
        storage_used: to_unsigned("storage_used", storage_used)?,
        file_count: to_unsigned("file_count", file_count)?,
        max_storage: max_storage
            .map(|v| to_unsigned("max_storage", v))
            .transpose()?,
        max_files: max_files.map(|v| to_unsigned("max_files", v)).transpose()?,
    })
}

#[async_trait]
impl UsageRepository for MySqlUsageRepository {
    async fn get(&self, owner: OwnerId) -> Result<Option<UsageCounters>> {
        self.fetch(owner).await
    }

    async fn ensure(&self, owner: OwnerId) -> Result<UsageCounters> {
        self.create_if_missing(owner).await?;
        self.fetch_existing(owner).await
    }

    async fn try_charge(
        &self,
        owner: OwnerId,
        bytes: u64,
        defaults: Limits,
    ) -> Result<ChargeOutcome> {
        self.create_if_missing(owner).await?;
        let incoming = to_signed("bytes", bytes)?;
        let default_storage = to_signed("default storage limit", defaults.storage_bytes)?;
        let default_files = to_signed("default file limit", defaults.files)?;

        for attempt in 1..=CHARGE_ATTEMPTS {
            let result = sqlx::query(
                r#"
                UPDATE usage_counters
                SET storage_used = storage_used + ?,
                    file_count = file_count + 1
                WHERE owner_id = ?
                  AND storage_used + ? <= COALESCE(max_storage, ?)
                  AND file_count + 1 <= COALESCE(max_files, ?)
                "#,
            )
            .bind(incoming)
            .bind(owner.get())
            .bind(incoming)
            .bind(default_storage)
            .bind(default_files)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

            let counters = self.fetch_existing(owner).await?;
            if result.rows_affected() > 0 {
                return Ok(ChargeOutcome::Charged(counters));
            }
            if let Err(denied) = counters.admits(bytes, defaults) {
                return Ok(ChargeOutcome::Denied(denied));
            }
            debug!(%owner, attempt, "conditional charge raced with another writer");
        }

        Err(StorageError::Operation(format!(
            "could not charge owner {owner} after {CHARGE_ATTEMPTS} attempts"
        )))
    }

    async fn apply_delta(&self, owner: OwnerId, delta: UsageDelta) -> Result<UsageCounters> {
        self.create_if_missing(owner).await?;
        sqlx::query(
            r#"
            UPDATE usage_counters
            SET storage_used = GREATEST(storage_used + ?, 0),
                file_count = GREATEST(file_count + ?, 0)
            WHERE owner_id = ?
            "#,
        )
        .bind(delta.bytes)
        .bind(delta.files)
        .bind(owner.get())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        self.fetch_existing(owner).await
    }

    async fn overwrite(&self, owner: OwnerId, usage: LiveUsage) -> Result<UsageCounters> {
        self.create_if_missing(owner).await?;
        sqlx::query("UPDATE usage_counters SET storage_used = ?, file_count = ? WHERE owner_id = ?")
            .bind(to_signed("storage_used", usage.bytes)?)
            .bind(to_signed("file_count", usage.files)?)
            .bind(owner.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.fetch_existing(owner).await
    }

    async fn set_limits(
        &self,
        owner: OwnerId,
        max_storage: Option<u64>,
        max_files: Option<u64>,
    ) -> Result<UsageCounters> {
        let max_storage = max_storage
            .map(|v| to_signed("max_storage", v))
            .transpose()?;
        let max_files = max_files.map(|v| to_signed("max_files", v)).transpose()?;

        self.create_if_missing(owner).await?;
        sqlx::query("UPDATE usage_counters SET max_storage = ?, max_files = ? WHERE owner_id = ?")
            .bind(max_storage)
            .bind(max_files)
            .bind(owner.get())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        self.fetch_existing(owner).await
    }
}
