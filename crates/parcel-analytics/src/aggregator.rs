use crate::range::DateRange;
use jiff::civil::Date;
use parcel_core::clock::utc_date;
use parcel_core::error::Result;
use parcel_core::{
    AccessKind, AccessLogEntry, AccessLogStore, Clock, ContentRepository, DailyBucket, LogScope,
    SystemClock,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use typed_builder::TypedBuilder;

/// Upper bounds on how many days one query may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct AnalyticsLimits {
    /// Content and link scopes.
    #[builder(default = 90)]
    pub max_item_days: u32,
    /// Owner scope.
    #[builder(default = 365)]
    pub max_owner_days: u32,
}

impl Default for AnalyticsLimits {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl AnalyticsLimits {
    pub fn max_days(&self, scope: &LogScope) -> u32 {
        match scope {
            LogScope::Content(_) | LogScope::Link(_) => self.max_item_days,
            LogScope::Owner(_) => self.max_owner_days,
        }
    }
}

#[derive(Default)]
struct Tally<'a> {
    total: u64,
    ips: HashSet<&'a str>,
    downloads: u64,
    uploads: u64,
}

/// Turns access log rows into dense daily series.
///
/// Read-only: the same log state always yields the same series, and calls
/// may run concurrently.
pub struct AnalyticsAggregator<A: ?Sized, C: ?Sized, K: ?Sized = SystemClock> {
    log: Arc<A>,
    contents: Arc<C>,
    clock: Arc<K>,
    limits: AnalyticsLimits,
}

impl<A, C, K> AnalyticsAggregator<A, C, K>
where
    A: AccessLogStore + ?Sized,
    C: ContentRepository + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(log: Arc<A>, contents: Arc<C>, clock: Arc<K>, limits: AnalyticsLimits) -> Self {
        Self {
            log,
            contents,
            clock,
            limits,
        }
    }

    pub fn limits(&self) -> &AnalyticsLimits {
        &self.limits
    }

    /// One bucket per day from `start` to `end`, both inclusive, after
    /// clamping the range to the scope's maximum.
    pub async fn aggregate(
        &self,
        scope: LogScope,
        start: Date,
        end: Date,
    ) -> Result<Vec<DailyBucket>> {
        let range = DateRange::clamped(start, end, self.limits.max_days(&scope));
        self.aggregate_range(scope, range).await
    }

    /// The last `days` days up to and including today (UTC).
    pub async fn aggregate_recent(&self, scope: LogScope, days: i64) -> Result<Vec<DailyBucket>> {
        let range = DateRange::recent(self.clock.today(), days, self.limits.max_days(&scope));
        self.aggregate_range(scope, range).await
    }

    async fn aggregate_range(&self, scope: LogScope, range: DateRange) -> Result<Vec<DailyBucket>> {
        let (from, until) = range.bounds();
        let rows = self.log.query(scope, from, until).await?;
        let created = match scope {
            LogScope::Owner(owner) => self.contents.created_between(owner, from, until).await?,
            LogScope::Content(_) | LogScope::Link(_) => Vec::new(),
        };

        debug!(
            %scope,
            start = %range.start(),
            end = %range.end(),
            rows = rows.len(),
            "aggregating access log"
        );

        Ok(bucketize(scope, range, &rows, &created))
    }
}

/// The single grouping pass. Every date in `range` gets a bucket; rows are
/// not assumed to be sorted.
fn bucketize(
    scope: LogScope,
    range: DateRange,
    rows: &[AccessLogEntry],
    created: &[jiff::Timestamp],
) -> Vec<DailyBucket> {
    let mut days: BTreeMap<Date, Tally<'_>> =
        range.dates().map(|date| (date, Tally::default())).collect();

    for row in rows.iter().filter(|row| row.matches(&scope)) {
        let Some(day) = days.get_mut(&utc_date(row.at)) else {
            continue;
        };
        day.total += 1;
        if let Some(ip) = row.client_ip() {
            day.ips.insert(ip);
        }
        if row.kind == AccessKind::Download {
            day.downloads += 1;
        }
    }

    for at in created {
        if let Some(day) = days.get_mut(&utc_date(*at)) {
            day.uploads += 1;
        }
    }

    days.into_iter()
        .map(|(date, day)| DailyBucket {
            date,
            total: day.total,
            unique: day.ips.len() as u64,
            downloads: matches!(scope, LogScope::Content(_)).then_some(day.downloads),
            uploads: matches!(scope, LogScope::Owner(_)).then_some(day.uploads),
        })
        .collect()
}
