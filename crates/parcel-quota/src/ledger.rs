use crate::error::{QuotaError, Result};
use crate::settings::QuotaSettings;
use crate::snapshot::QuotaSnapshot;
use dashmap::DashMap;
use parcel_core::{
    AdmissionDenied, ChargeOutcome, ContentRepository, LiveUsage, OwnerId, StorageError,
    UsageCounters, UsageDelta, UsageRepository,
};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockReadGuard, RwLock};
use tracing::{debug, info, trace, warn};

/// Shared hold on an owner's counters.
///
/// While any hold is alive, [`QuotaLedger::reconcile`] for that owner waits.
/// Take one around every mutation that keeps the counters and the content
/// rows out of step for a moment, such as charge-then-insert or
/// delete-then-release.
pub type UsageHold = OwnedRwLockReadGuard<()>;

/// Outcome of a [`QuotaLedger::reconcile`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciliation {
    pub owner: OwnerId,
    /// Cached counters before the overwrite.
    pub before: LiveUsage,
    /// Counters recomputed from the live content rows.
    pub after: LiveUsage,
}

impl Reconciliation {
    pub fn is_drifted(&self) -> bool {
        self.before != self.after
    }

    /// `after - before`.
    pub fn drift(&self) -> UsageDelta {
        UsageDelta {
            bytes: signed(self.after.bytes) - signed(self.before.bytes),
            files: signed(self.after.files) - signed(self.before.files),
        }
    }
}

fn signed(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Per-owner usage counters with admission checks.
///
/// Concurrent admissions for one owner are serialized by the usage store's
/// atomic [`try_charge`](UsageRepository::try_charge): two uploads can never
/// both pass the check on a stale counter and jointly overshoot the limit.
///
/// Reconcile overwrites the counters with the sum of live rows, so it is
/// excluded per owner against in-flight uploads and deletes through
/// [`UsageHold`]s. The exclusion is per process; clones of one ledger share it.
pub struct QuotaLedger<U: ?Sized, C: ?Sized> {
    usage: Arc<U>,
    contents: Arc<C>,
    settings: QuotaSettings,
    gates: Arc<DashMap<OwnerId, Arc<RwLock<()>>>>,
}

impl<U: ?Sized, C: ?Sized> Clone for QuotaLedger<U, C> {
    fn clone(&self) -> Self {
        Self {
            usage: Arc::clone(&self.usage),
            contents: Arc::clone(&self.contents),
            settings: self.settings,
            gates: Arc::clone(&self.gates),
        }
    }
}

impl<U, C> QuotaLedger<U, C>
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
{
    pub fn new(usage: Arc<U>, contents: Arc<C>, settings: QuotaSettings) -> Self {
        Self {
            usage,
            contents,
            settings,
            gates: Arc::new(DashMap::new()),
        }
    }

    fn gate(&self, owner: OwnerId) -> Arc<RwLock<()>> {
        Arc::clone(self.gates.entry(owner).or_default().value())
    }

    /// Takes a shared hold on the owner's counters.
    pub async fn hold(&self, owner: OwnerId) -> UsageHold {
        self.gate(owner).read_owned().await
    }

    pub fn settings(&self) -> &QuotaSettings {
        &self.settings
    }

    /// Rejects uploads larger than the per-file maximum.
    pub fn check_upload_size(&self, size: u64) -> std::result::Result<(), AdmissionDenied> {
        if size > self.settings.max_upload_bytes {
            return Err(AdmissionDenied::FileTooLarge {
                size,
                max: self.settings.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Whether one more file of `incoming` bytes would fit right now.
    ///
    /// Advisory only: the answer can be stale by the time the caller acts on
    /// it. Uploads go through [`reserve`](Self::reserve) instead.
    pub async fn can_admit(
        &self,
        owner: OwnerId,
        incoming: u64,
    ) -> std::result::Result<bool, StorageError> {
        let counters = self.current(owner).await?;
        Ok(counters
            .admits(incoming, self.settings.default_limits())
            .is_ok())
    }

    /// Charges one file of `size` bytes for an upload about to be stored.
    ///
    /// The returned [`Reservation`] keeps a [`UsageHold`] until it is settled
    /// or released, and gives the charge back if it is dropped unsettled.
    pub async fn admit(&self, owner: OwnerId, size: u64) -> Result<Reservation<U, C>> {
        let hold = self.hold(owner).await;
        let counters = self.reserve(owner, size).await?;
        Ok(Reservation {
            ledger: self.clone(),
            owner,
            size,
            counters,
            hold: Some(hold),
        })
    }

    /// Atomically checks and charges one file of `size` bytes.
    ///
    /// On success the bytes are already counted; a caller that fails to
    /// persist the upload afterwards must [`release`](Self::release) them.
    /// Uploads should go through [`admit`](Self::admit).
    pub async fn reserve(&self, owner: OwnerId, size: u64) -> Result<UsageCounters> {
        if let Err(denied) = self.check_upload_size(size) {
            debug!(owner_id = %owner, %denied, "upload refused");
            return Err(denied.into());
        }

        match self
            .usage
            .try_charge(owner, size, self.settings.default_limits())
            .await?
        {
            ChargeOutcome::Charged(counters) => {
                trace!(
                    owner_id = %owner,
                    size,
                    storage_used = counters.storage_used,
                    file_count = counters.file_count,
                    "quota charged"
                );
                Ok(counters)
            }
            ChargeOutcome::Denied(denied) => {
                debug!(owner_id = %owner, %denied, "upload refused");
                Err(QuotaError::Denied(denied))
            }
        }
    }

    /// Returns a reservation for an upload that was never persisted.
    pub async fn release(
        &self,
        owner: OwnerId,
        size: u64,
    ) -> std::result::Result<UsageCounters, StorageError> {
        self.commit(owner, UsageDelta::removal(size)).await
    }

    /// Applies a signed delta. Counters clamp at zero; a clamp means the
    /// ledger had drifted and is not an error.
    pub async fn commit(
        &self,
        owner: OwnerId,
        delta: UsageDelta,
    ) -> std::result::Result<UsageCounters, StorageError> {
        if delta.is_zero() {
            return self.usage.ensure(owner).await;
        }
        let counters = self.usage.apply_delta(owner, delta).await?;
        trace!(
            owner_id = %owner,
            bytes = delta.bytes,
            files = delta.files,
            storage_used = counters.storage_used,
            "quota delta applied"
        );
        Ok(counters)
    }

    /// Recomputes the owner's counters from their live content rows and
    /// overwrites the cached values.
    ///
    /// Waits until no [`UsageHold`] for the owner is alive, so an admitted
    /// upload is either already a live row or already released when the
    /// rows are summed.
    pub async fn reconcile(
        &self,
        owner: OwnerId,
    ) -> std::result::Result<Reconciliation, StorageError> {
        let _exclusive = self.gate(owner).write_owned().await;
        let cached = self.usage.ensure(owner).await?;
        let live = self.contents.live_usage(owner).await?;
        self.usage.overwrite(owner, live).await?;

        let outcome = Reconciliation {
            owner,
            before: LiveUsage {
                bytes: cached.storage_used,
                files: cached.file_count,
            },
            after: live,
        };

        if outcome.is_drifted() {
            info!(
                owner_id = %owner,
                storage_before = outcome.before.bytes,
                storage_after = outcome.after.bytes,
                files_before = outcome.before.files,
                files_after = outcome.after.files,
                "usage drift corrected"
            );
        }
        Ok(outcome)
    }

    /// Creates the owner's counters if they do not exist yet.
    pub async fn open_account(
        &self,
        owner: OwnerId,
    ) -> std::result::Result<UsageCounters, StorageError> {
        self.usage.ensure(owner).await
    }

    /// Sets or clears (`None`) the owner's limit overrides.
    pub async fn set_limits(
        &self,
        owner: OwnerId,
        max_storage: Option<u64>,
        max_files: Option<u64>,
    ) -> std::result::Result<UsageCounters, StorageError> {
        let counters = self.usage.set_limits(owner, max_storage, max_files).await?;
        info!(owner_id = %owner, ?max_storage, ?max_files, "quota limits updated");
        Ok(counters)
    }

    pub async fn snapshot(
        &self,
        owner: OwnerId,
    ) -> std::result::Result<QuotaSnapshot, StorageError> {
        let counters = self.current(owner).await?;
        Ok(QuotaSnapshot::new(
            &counters,
            self.settings.default_limits(),
        ))
    }

    /// The owner's counters without creating a row for unknown owners.
    async fn current(&self, owner: OwnerId) -> std::result::Result<UsageCounters, StorageError> {
        Ok(self
            .usage
            .get(owner)
            .await?
            .unwrap_or_else(|| UsageCounters::empty(owner)))
    }
}

/// Quota charged for an upload that is not stored yet.
#[must_use = "an unsettled reservation is released when dropped"]
pub struct Reservation<U, C>
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
{
    ledger: QuotaLedger<U, C>,
    owner: OwnerId,
    size: u64,
    counters: UsageCounters,
    hold: Option<UsageHold>,
}

impl<U, C> Reservation<U, C>
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
{
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Counters right after the charge.
    pub fn counters(&self) -> &UsageCounters {
        &self.counters
    }

    /// The upload's row is stored; the charge stays.
    pub fn settle(mut self) {
        self.hold.take();
    }

    /// Gives the charge back.
    pub async fn release(mut self) -> std::result::Result<UsageCounters, StorageError> {
        let hold = self.hold.take();
        let released = self.ledger.release(self.owner, self.size).await;
        drop(hold);
        released
    }
}

impl<U, C> Drop for Reservation<U, C>
where
    U: UsageRepository + ?Sized,
    C: ContentRepository + ?Sized,
{
    fn drop(&mut self) {
        let Some(hold) = self.hold.take() else {
            return;
        };
        let (owner, size) = (self.owner, self.size);
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                owner_id = %owner,
                size,
                "reservation dropped outside a runtime, left to reconcile"
            );
            return;
        };

        debug!(owner_id = %owner, size, "releasing abandoned reservation");
        let ledger = self.ledger.clone();
        runtime.spawn(async move {
            if let Err(err) = ledger.release(owner, size).await {
                warn!(
                    owner_id = %owner,
                    size,
                    error = %err,
                    "failed to release abandoned reservation"
                );
            }
            drop(hold);
        });
    }
}
