use crate::error::AdmissionDenied;
use crate::ids::OwnerId;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign};

/// Storage and file-count limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Limits {
    pub storage_bytes: u64,
    pub files: u64,
}

/// The per-owner usage row.
///
/// `storage_used` and `file_count` are a denormalised cache of the live
/// content rows owned by `owner`. They may drift after partial failures and
/// are corrected by recomputing [`LiveUsage`] from the content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub owner: OwnerId,
    pub storage_used: u64,
    pub file_count: u64,
    /// Per-owner override; `None` falls back to the system default.
    pub max_storage: Option<u64>,
    /// Per-owner override; `None` falls back to the system default.
    pub max_files: Option<u64>,
}

impl UsageCounters {
    pub fn empty(owner: OwnerId) -> Self {
        Self {
            owner,
            storage_used: 0,
            file_count: 0,
            max_storage: None,
            max_files: None,
        }
    }

    pub fn effective_limits(&self, defaults: Limits) -> Limits {
        Limits {
            storage_bytes: self.max_storage.unwrap_or(defaults.storage_bytes),
            files: self.max_files.unwrap_or(defaults.files),
        }
    }

    /// The admission predicate: `used + incoming <= limit` and
    /// `count + 1 <= max_count`.
    pub fn admits(&self, incoming: u64, defaults: Limits) -> Result<(), AdmissionDenied> {
        let limits = self.effective_limits(defaults);

        let fits = self
            .storage_used
            .checked_add(incoming)
            .is_some_and(|total| total <= limits.storage_bytes);
        if !fits {
            return Err(AdmissionDenied::StorageLimit {
                used: self.storage_used,
                incoming,
                limit: limits.storage_bytes,
            });
        }

        let has_slot = self
            .file_count
            .checked_add(1)
            .is_some_and(|total| total <= limits.files);
        if !has_slot {
            return Err(AdmissionDenied::FileCountLimit {
                count: self.file_count,
                limit: limits.files,
            });
        }

        Ok(())
    }

    /// Applies a signed delta, clamping both counters at zero.
    pub fn apply(&mut self, delta: UsageDelta) {
        self.storage_used = clamped_add(self.storage_used, delta.bytes);
        self.file_count = clamped_add(self.file_count, delta.files);
    }
}

fn clamped_add(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// A signed change to an owner's usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDelta {
    pub bytes: i64,
    pub files: i64,
}

impl UsageDelta {
    /// The delta charged for one stored file of `size` bytes.
    pub fn upload(size: u64) -> Self {
        Self {
            bytes: to_signed(size),
            files: 1,
        }
    }

    /// The delta released when one file of `size` bytes is removed.
    pub fn removal(size: u64) -> Self {
        Self {
            bytes: -to_signed(size),
            files: -1,
        }
    }

    /// A byte-only delta, leaving the file count untouched.
    pub fn bytes(bytes: i64) -> Self {
        Self { bytes, files: 0 }
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == 0 && self.files == 0
    }
}

fn to_signed(size: u64) -> i64 {
    i64::try_from(size).unwrap_or(i64::MAX)
}

impl Add for UsageDelta {
    type Output = UsageDelta;

    fn add(self, rhs: Self) -> Self::Output {
        UsageDelta {
            bytes: self.bytes.saturating_add(rhs.bytes),
            files: self.files.saturating_add(rhs.files),
        }
    }
}

impl AddAssign for UsageDelta {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

/// The authoritative usage recomputed from live content rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveUsage {
    pub bytes: u64,
    pub files: u64,
}

/// Result of an atomic increment-with-limit-check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeOutcome {
    /// The charge was applied; carries the counters after the update.
    Charged(UsageCounters),
    /// The charge would have exceeded a limit; nothing was changed.
    Denied(AdmissionDenied),
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: Limits = Limits {
        storage_bytes: 100,
        files: 3,
    };

    fn counters(used: u64, count: u64) -> UsageCounters {
        UsageCounters {
            storage_used: used,
            file_count: count,
            ..UsageCounters::empty(OwnerId(1))
        }
    }

    #[test]
    fn admits_up_to_and_including_the_limit() {
        assert!(counters(99, 0).admits(1, DEFAULTS).is_ok());
        assert!(counters(100, 0).admits(0, DEFAULTS).is_ok());
        assert!(matches!(
            counters(100, 0).admits(1, DEFAULTS),
            Err(AdmissionDenied::StorageLimit { .. })
        ));
    }

    #[test]
    fn file_count_is_checked_after_storage() {
        assert!(counters(0, 2).admits(0, DEFAULTS).is_ok());
        assert_eq!(
            counters(0, 3).admits(0, DEFAULTS),
            Err(AdmissionDenied::FileCountLimit { count: 3, limit: 3 })
        );
    }

    #[test]
    fn overrides_replace_defaults() {
        let mut c = counters(150, 0);
        assert!(c.admits(0, DEFAULTS).is_err());
        c.max_storage = Some(1_000);
        c.max_files = Some(10);
        assert!(c.admits(850, DEFAULTS).is_ok());
    }

    #[test]
    fn huge_incoming_does_not_overflow() {
        assert!(counters(1, 0).admits(u64::MAX, DEFAULTS).is_err());
    }

    #[test]
    fn apply_clamps_at_zero() {
        let mut c = counters(10, 1);
        c.apply(UsageDelta::removal(25));
        assert_eq!(c.storage_used, 0);
        assert_eq!(c.file_count, 0);

        c.apply(UsageDelta::removal(5));
        assert_eq!(c.storage_used, 0);
        assert_eq!(c.file_count, 0);

        c.apply(UsageDelta::upload(7));
        assert_eq!(c.storage_used, 7);
        assert_eq!(c.file_count, 1);
    }

    #[test]
    fn deltas_accumulate() {
        let mut total = UsageDelta::default();
        total += UsageDelta::removal(10);
        total += UsageDelta::removal(5);
        assert_eq!(total, UsageDelta { bytes: -15, files: -2 });
        assert!(!total.is_zero());
        assert!(UsageDelta::default().is_zero());
    }
}
