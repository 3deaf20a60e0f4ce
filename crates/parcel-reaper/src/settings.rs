use std::time::Duration;
use typed_builder::TypedBuilder;

const MINUTE: u64 = 60;
const DAY: u64 = 24 * 60 * MINUTE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct ReaperSettings {
    /// Time between the starts of two periodic sweeps.
    #[builder(default = Duration::from_secs(5 * MINUTE))]
    pub interval: Duration,
    /// Run a full reconcile for every owner whose content was reaped.
    #[builder(default = true)]
    pub reconcile_touched: bool,
    /// Access log rows older than this are pruned after each periodic
    /// sweep. `None` keeps them forever.
    #[builder(default = Some(Duration::from_secs(30 * DAY)))]
    pub log_retention: Option<Duration>,
}

impl Default for ReaperSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}
