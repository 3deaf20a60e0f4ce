use crate::access::{AccessKind, AccessLogEntry, LogScope};
use crate::content::{ContentItem, NewContent};
use crate::error::Result;
use crate::ids::{ContentId, LinkId, OwnerId};
use crate::link::{NewLink, ShortLink};
use crate::shortcode::ShortCode;
use crate::usage::{ChargeOutcome, Limits, LiveUsage, UsageCounters, UsageDelta};
use async_trait::async_trait;
use jiff::Timestamp;

/// Existence check for short codes within one namespace.
///
/// Content codes and link codes are separate namespaces, so each repository
/// answers only for its own table. This check is a best-effort pre-filter;
/// uniqueness is enforced by `insert` failing with
/// [`StorageError::Conflict`](crate::StorageError::Conflict).
#[async_trait]
pub trait CodeLookup: Send + Sync + 'static {
    /// Checks whether a short code is already taken in this namespace.
    async fn code_exists(&self, code: &ShortCode) -> Result<bool>;
}

#[async_trait]
pub trait ContentRepository: CodeLookup {
    /// Inserts a new content row and assigns its id.
    /// Returns `Err(Conflict)` if the code already exists.
    async fn insert(&self, content: NewContent) -> Result<ContentItem>;

    async fn get(&self, id: ContentId) -> Result<Option<ContentItem>>;

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ContentItem>>;

    /// Deletes the content row.
    /// Returns `true` if the row existed and was removed.
    async fn delete(&self, id: ContentId) -> Result<bool>;

    /// Bumps the denormalised view or download counter.
    /// Other kinds are ignored.
    async fn increment_counter(&self, id: ContentId, kind: AccessKind) -> Result<()>;

    /// Every row that is expired at `now` or has reached its view limit.
    async fn find_reapable(&self, now: Timestamp) -> Result<Vec<ContentItem>>;

    /// Sum of sizes and number of live rows owned by `owner`.
    async fn live_usage(&self, owner: OwnerId) -> Result<LiveUsage>;

    /// Creation timestamps of the owner's rows in `[from, until)`.
    async fn created_between(
        &self,
        owner: OwnerId,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<Timestamp>>;
}

#[async_trait]
pub trait LinkRepository: CodeLookup {
    /// Inserts a new link and assigns its id.
    /// Returns `Err(Conflict)` if the code already exists.
    async fn insert(&self, link: NewLink) -> Result<ShortLink>;

    async fn get(&self, id: LinkId) -> Result<Option<ShortLink>>;

    async fn get_by_code(&self, code: &ShortCode) -> Result<Option<ShortLink>>;

    /// Returns `true` if the link existed and was removed.
    async fn delete(&self, id: LinkId) -> Result<bool>;

    async fn increment_clicks(&self, id: LinkId) -> Result<()>;
}

/// Storage for the per-owner usage counters.
///
/// Every mutating method must be atomic per owner: two concurrent calls for
/// the same owner never observe each other's intermediate state.
#[async_trait]
pub trait UsageRepository: Send + Sync + 'static {
    async fn get(&self, owner: OwnerId) -> Result<Option<UsageCounters>>;

    /// Returns the owner's counters, creating an empty row if missing.
    async fn ensure(&self, owner: OwnerId) -> Result<UsageCounters>;

    /// Increment-with-limit-check: adds `bytes` and one file iff the result
    /// stays within the owner's effective limits.
    async fn try_charge(
        &self,
        owner: OwnerId,
        bytes: u64,
        defaults: Limits,
    ) -> Result<ChargeOutcome>;

    /// Applies a signed delta, clamping both counters at zero.
    async fn apply_delta(&self, owner: OwnerId, delta: UsageDelta) -> Result<UsageCounters>;

    /// Replaces the cached counters with recomputed values.
    async fn overwrite(&self, owner: OwnerId, usage: LiveUsage) -> Result<UsageCounters>;

    /// Sets or clears the owner's limit overrides.
    async fn set_limits(
        &self,
        owner: OwnerId,
        max_storage: Option<u64>,
        max_files: Option<u64>,
    ) -> Result<UsageCounters>;
}

/// The append-only access log.
#[async_trait]
pub trait AccessLogStore: Send + Sync + 'static {
    async fn append(&self, entry: AccessLogEntry) -> Result<()>;

    /// All rows in `scope` with `from <= at < until`, in no particular order.
    async fn query(
        &self,
        scope: LogScope,
        from: Timestamp,
        until: Timestamp,
    ) -> Result<Vec<AccessLogEntry>>;

    /// Bulk retention pruning. Returns the number of rows removed.
    async fn prune_before(&self, cutoff: Timestamp) -> Result<u64>;
}
