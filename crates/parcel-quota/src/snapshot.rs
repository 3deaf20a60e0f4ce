use parcel_core::{Limits, OwnerId, UsageCounters};
use serde::Serialize;

/// Usage at or above this share of a limit is "approaching".
pub const APPROACHING_PERCENT: u64 = 80;
/// Usage at or above this share of a limit is "critical".
pub const CRITICAL_PERCENT: u64 = 95;

/// Read-only projection of an owner's usage against their effective limits.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaSnapshot {
    pub owner_id: OwnerId,
    pub storage_used: u64,
    pub storage_limit: u64,
    pub storage_percent: f64,
    pub file_count: u64,
    pub file_limit: u64,
    pub file_percent: f64,
    pub storage_approaching_limit: bool,
    pub storage_critical: bool,
    pub files_approaching_limit: bool,
    pub files_critical: bool,
    /// Either dimension is approaching its limit.
    pub approaching_limit: bool,
    /// Either dimension is critical.
    pub critical: bool,
}

impl QuotaSnapshot {
    pub fn new(counters: &UsageCounters, defaults: Limits) -> Self {
        let limits = counters.effective_limits(defaults);
        let storage_approaching =
            at_least(counters.storage_used, limits.storage_bytes, APPROACHING_PERCENT);
        let storage_critical =
            at_least(counters.storage_used, limits.storage_bytes, CRITICAL_PERCENT);
        let files_approaching = at_least(counters.file_count, limits.files, APPROACHING_PERCENT);
        let files_critical = at_least(counters.file_count, limits.files, CRITICAL_PERCENT);

        Self {
            owner_id: counters.owner,
            storage_used: counters.storage_used,
            storage_limit: limits.storage_bytes,
            storage_percent: percent(counters.storage_used, limits.storage_bytes),
            file_count: counters.file_count,
            file_limit: limits.files,
            file_percent: percent(counters.file_count, limits.files),
            storage_approaching_limit: storage_approaching,
            storage_critical,
            files_approaching_limit: files_approaching,
            files_critical,
            approaching_limit: storage_approaching || files_approaching,
            critical: storage_critical || files_critical,
        }
    }
}

/// `used / limit` as a percentage with two decimals. A zero limit reads as
/// full.
fn percent(used: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 100.0;
    }
    let raw = used as f64 * 100.0 / limit as f64;
    (raw * 100.0).round() / 100.0
}

/// `used >= threshold% of limit`, in integer arithmetic so that exactly 80%
/// is approaching regardless of float rounding.
fn at_least(used: u64, limit: u64, threshold: u64) -> bool {
    u128::from(used) * 100 >= u128::from(limit) * u128::from(threshold)
}
