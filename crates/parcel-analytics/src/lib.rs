//! Day-bucketed access analytics.
//!
//! Raw access log rows are grouped by their UTC calendar date into a dense,
//! gap-filled series of [`DailyBucket`](parcel_core::DailyBucket)s.

mod aggregator;
mod range;

pub use aggregator::{AnalyticsAggregator, AnalyticsLimits};
pub use range::DateRange;
