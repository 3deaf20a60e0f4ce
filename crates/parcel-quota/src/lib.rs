//! Per-owner storage accounting.
//!
//! The [`QuotaLedger`] keeps denormalised usage counters for O(1) admission
//! checks and offers [`QuotaLedger::reconcile`] to recompute them from the
//! live content rows whenever they drift.

mod error;
mod ledger;
mod settings;
mod snapshot;

pub use error::{QuotaError, Result};
pub use ledger::{QuotaLedger, Reconciliation, Reservation, UsageHold};
pub use settings::QuotaSettings;
pub use snapshot::{QuotaSnapshot, APPROACHING_PERCENT, CRITICAL_PERCENT};
