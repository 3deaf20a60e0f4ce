//! Periodic removal of expired and view-exhausted content.
//!
//! A sweep moves through [`ReaperPhase::Scanning`], [`ReaperPhase::Deleting`]
//! and [`ReaperPhase::Reconciling`] before returning to
//! [`ReaperPhase::Idle`], whatever happened to individual items.

mod error;
mod reaper;
mod settings;

pub use error::ReapError;
pub use reaper::{LifecycleReaper, ReaperPhase, SweepReport};
pub use settings::ReaperSettings;
