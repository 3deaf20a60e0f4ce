use parcel_core::{LiveUsage, OwnerId};
use parcel_quota::Reconciliation;
use serde::{Deserialize, Serialize};

/// `None` restores the system default for that dimension.
#[derive(Debug, Default, Deserialize)]
pub struct LimitsRequest {
    pub max_storage_bytes: Option<u64>,
    pub max_files: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub owner_id: OwnerId,
    pub before: LiveUsage,
    pub after: LiveUsage,
    pub drifted: bool,
}

impl From<Reconciliation> for ReconcileResponse {
    fn from(value: Reconciliation) -> Self {
        Self {
            owner_id: value.owner,
            before: value.before,
            after: value.after,
            drifted: value.is_drifted(),
        }
    }
}
