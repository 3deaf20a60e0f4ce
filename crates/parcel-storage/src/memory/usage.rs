use async_trait::async_trait;
use dashmap::DashMap;
use parcel_core::error::Result;
use parcel_core::{
    ChargeOutcome, Limits, LiveUsage, OwnerId, UsageCounters, UsageDelta, UsageRepository,
};

/// In-memory usage counters. Each owner's row is mutated under its map
/// entry lock, which serializes concurrent charges for the same owner.
#[derive(Debug, Default)]
pub struct InMemoryUsageRepository {
    rows: DashMap<OwnerId, UsageCounters>,
}

impl InMemoryUsageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of owners with counters.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn get(&self, owner: OwnerId) -> Result<Option<UsageCounters>> {
        Ok(self.rows.get(&owner).map(|row| row.value().clone()))
    }

    async fn ensure(&self, owner: OwnerId) -> Result<UsageCounters> {
        Ok(self
            .rows
            .entry(owner)
            .or_insert_with(|| UsageCounters::empty(owner))
            .clone())
    }

    async fn try_charge(
        &self,
        owner: OwnerId,
        bytes: u64,
        defaults: Limits,
    ) -> Result<ChargeOutcome> {
        let mut row = self
            .rows
            .entry(owner)
            .or_insert_with(|| UsageCounters::empty(owner));

        Ok(match row.admits(bytes, defaults) {
            Ok(()) => {
                row.apply(UsageDelta::upload(bytes));
                ChargeOutcome::Charged(row.clone())
            }
            Err(denied) => ChargeOutcome::Denied(denied),
        })
    }

    async fn apply_delta(&self, owner: OwnerId, delta: UsageDelta) -> Result<UsageCounters> {
        let mut row = self
            .rows
            .entry(owner)
            .or_insert_with(|| UsageCounters::empty(owner));
        row.apply(delta);
        Ok(row.clone())
    }

    async fn overwrite(&self, owner: OwnerId, usage: LiveUsage) -> Result<UsageCounters> {
        let mut row = self
            .rows
            .entry(owner)
            .or_insert_with(|| UsageCounters::empty(owner));
        row.storage_used = usage.bytes;
        row.file_count = usage.files;
        Ok(row.clone())
    }

    async fn set_limits(
        &self,
        owner: OwnerId,
        max_storage: Option<u64>,
        max_files: Option<u64>,
    ) -> Result<UsageCounters> {
        let mut row = self
            .rows
            .entry(owner)
            .or_insert_with(|| UsageCounters::empty(owner));
        row.max_storage = max_storage;
        row.max_files = max_files;
        Ok(row.clone())
    }
}
