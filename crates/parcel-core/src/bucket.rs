use jiff::civil::Date;
use serde::{Deserialize, Serialize};

/// One calendar day (UTC) of aggregated access counts.
///
/// Serialises as `{"date":"YYYY-MM-DD","total":n,"unique":n}` plus the
/// scope-specific extras when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBucket {
    pub date: Date,
    /// Every matching event on that day.
    pub total: u64,
    /// Distinct non-empty client IPs on that day.
    pub unique: u64,
    /// Download events (content scope only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloads: Option<u64>,
    /// Content items created (owner scope only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploads: Option<u64>,
}

impl DailyBucket {
    pub fn empty(date: Date) -> Self {
        Self {
            date,
            total: 0,
            unique: 0,
            downloads: None,
            uploads: None,
        }
    }
}
