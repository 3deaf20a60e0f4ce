use crate::error::ReapError;
use crate::settings::ReaperSettings;
use jiff::{SignedDuration, Timestamp};
use parcel_core::{
    AccessLogStore, BlobDeletion, BlobStore, Clock, ContentItem, ContentRepository, OwnerId,
    SystemClock, UsageDelta, UsageRepository,
};
use parcel_quota::{QuotaLedger, UsageHold};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReaperPhase {
    #[default]
    Idle,
    Scanning,
    Deleting,
    Reconciling,
}

/// What one sweep did. Only used for logging and operator visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SweepReport {
    /// Items that matched the eligibility predicate.
    pub scanned: usize,
    /// Items whose blobs and row were removed.
    pub cleaned: usize,
    /// Items left in place after a failure; they stay eligible.
    pub failed: usize,
    /// Items whose row was already gone, e.g. deleted explicitly meanwhile.
    pub skipped: usize,
    pub owners_reconciled: usize,
    /// The sweep stopped early because shutdown was requested.
    pub interrupted: bool,
}

enum ItemOutcome {
    Cleaned,
    AlreadyGone,
}

/// Resets the published phase to idle however the sweep ends.
struct PhaseGuard<'a>(&'a watch::Sender<ReaperPhase>);

impl PhaseGuard<'_> {
    fn enter(&self, phase: ReaperPhase) {
        self.0.send_replace(phase);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.0.send_replace(ReaperPhase::Idle);
    }
}

/// Finds content that is expired or has used up its views, deletes its
/// blobs and row, and settles the owners' quota.
///
/// The reaper shares no in-memory state with request handlers; it works
/// purely through the repositories. Sweeps never overlap: a manual trigger
/// that arrives during a periodic sweep waits for it to finish.
pub struct LifecycleReaper<C: ?Sized, U: ?Sized, B: ?Sized, A: ?Sized, K: ?Sized = SystemClock> {
    contents: Arc<C>,
    ledger: QuotaLedger<U, C>,
    blobs: Arc<B>,
    access_log: Arc<A>,
    clock: Arc<K>,
    settings: ReaperSettings,
    phase: watch::Sender<ReaperPhase>,
    sweep_lock: Mutex<()>,
}

impl<C, U, B, A, K> LifecycleReaper<C, U, B, A, K>
where
    C: ContentRepository + ?Sized,
    U: UsageRepository + ?Sized,
    B: BlobStore + ?Sized,
    A: AccessLogStore + ?Sized,
    K: Clock + ?Sized,
{
    pub fn new(
        contents: Arc<C>,
        ledger: QuotaLedger<U, C>,
        blobs: Arc<B>,
        access_log: Arc<A>,
        clock: Arc<K>,
        settings: ReaperSettings,
    ) -> Self {
        let (phase, _) = watch::channel(ReaperPhase::Idle);
        Self {
            contents,
            ledger,
            blobs,
            access_log,
            clock,
            settings,
            phase,
            sweep_lock: Mutex::new(()),
        }
    }

    pub fn settings(&self) -> &ReaperSettings {
        &self.settings
    }

    pub fn phase(&self) -> ReaperPhase {
        *self.phase.borrow()
    }

    /// Follows phase changes.
    pub fn subscribe(&self) -> watch::Receiver<ReaperPhase> {
        self.phase.subscribe()
    }

    /// Runs one full sweep.
    ///
    /// Per-item failures are logged and counted, never returned: the item
    /// stays eligible and is retried by the next sweep. Only a failure to
    /// list candidates fails the sweep as a whole.
    pub async fn sweep(&self) -> Result<SweepReport, ReapError> {
        self.sweep_until(None).await
    }

    async fn sweep_until(
        &self,
        stop: Option<&watch::Receiver<bool>>,
    ) -> Result<SweepReport, ReapError> {
        let _serial = self.sweep_lock.lock().await;
        let phase = PhaseGuard(&self.phase);
        let now = self.clock.now();

        phase.enter(ReaperPhase::Scanning);
        let candidates = self
            .contents
            .find_reapable(now)
            .await
            .map_err(ReapError::Scan)?;
        let mut report = SweepReport {
            scanned: candidates.len(),
            ..SweepReport::default()
        };
        if candidates.is_empty() {
            debug!("nothing to reap");
            return Ok(report);
        }

        phase.enter(ReaperPhase::Deleting);
        let mut pending: BTreeMap<OwnerId, UsageDelta> = BTreeMap::new();
        // taken once per owner; a second read on the same gate can deadlock
        // behind a queued reconcile
        let mut holds: BTreeMap<OwnerId, UsageHold> = BTreeMap::new();
        for (done, item) in candidates.iter().enumerate() {
            if stop.is_some_and(|stop| *stop.borrow()) {
                report.interrupted = true;
                info!(remaining = candidates.len() - done, "sweep interrupted by shutdown");
                break;
            }

            if let Some(owner) = item.owner {
                if let Entry::Vacant(slot) = holds.entry(owner) {
                    slot.insert(self.ledger.hold(owner).await);
                }
            }

            match self.reap(item).await {
                Ok(ItemOutcome::Cleaned) => {
                    report.cleaned += 1;
                    if let Some(owner) = item.owner {
                        *pending.entry(owner).or_default() += UsageDelta::removal(item.size);
                    }
                }
                Ok(ItemOutcome::AlreadyGone) => report.skipped += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        content_id = %item.id,
                        code = %item.code,
                        error = %err,
                        "failed to reap content, will retry next sweep"
                    );
                }
            }
        }

        phase.enter(ReaperPhase::Reconciling);
        for (owner, delta) in pending {
            if let Err(err) = self.ledger.commit(owner, delta).await {
                warn!(owner_id = %owner, error = %err, "failed to release reaped usage");
            }
            drop(holds.remove(&owner));
            if self.settings.reconcile_touched {
                match self.ledger.reconcile(owner).await {
                    Ok(_) => report.owners_reconciled += 1,
                    Err(err) => warn!(owner_id = %owner, error = %err, "failed to reconcile usage"),
                }
            }
        }

        info!(
            scanned = report.scanned,
            cleaned = report.cleaned,
            failed = report.failed,
            skipped = report.skipped,
            "sweep finished"
        );
        Ok(report)
    }

    /// Deletes one item's blobs, then its row. A blob that is already gone
    /// counts as deleted.
    async fn reap(&self, item: &ContentItem) -> Result<ItemOutcome, ReapError> {
        let paths = std::iter::once(&item.storage_path).chain(item.thumbnail_path.as_ref());
        for path in paths {
            let deletion = self
                .blobs
                .delete(path)
                .await
                .map_err(|source| ReapError::Blob {
                    id: item.id,
                    source,
                })?;
            if deletion == BlobDeletion::NotFound {
                debug!(content_id = %item.id, %path, "blob already gone");
            }
        }

        let removed = self
            .contents
            .delete(item.id)
            .await
            .map_err(|source| ReapError::Row {
                id: item.id,
                source,
            })?;

        Ok(if removed {
            ItemOutcome::Cleaned
        } else {
            ItemOutcome::AlreadyGone
        })
    }

    /// Removes access log rows older than the retention window.
    pub async fn prune_access_log(&self) -> Result<u64, ReapError> {
        let Some(retention) = self.settings.log_retention else {
            return Ok(0);
        };
        let retention = SignedDuration::try_from(retention).unwrap_or(SignedDuration::MAX);
        let cutoff = self
            .clock
            .now()
            .checked_sub(retention)
            .unwrap_or(Timestamp::MIN);

        let removed = self
            .access_log
            .prune_before(cutoff)
            .await
            .map_err(ReapError::Prune)?;
        if removed > 0 {
            info!(removed, %cutoff, "access log pruned");
        }
        Ok(removed)
    }

    /// Sweeps on every tick of the configured interval, starting
    /// immediately, until `shutdown` turns `true` or its sender is dropped.
    ///
    /// A shutdown that arrives mid-sweep stops it between items; quota for
    /// items already removed is still settled.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.settings.interval.as_secs(),
            "reaper started"
        );

        let mut ticker = interval(self.settings.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            let signalled = tokio::select! {
                _ = ticker.tick() => None,
                changed = shutdown.changed() => Some(changed.is_ok()),
            };
            match signalled {
                None => {}
                Some(true) => continue,
                Some(false) => break,
            }

            match self.sweep_until(Some(&shutdown)).await {
                Ok(report) => debug!(?report, "periodic sweep done"),
                Err(err) => error!(error = %err, "periodic sweep failed"),
            }
            if let Err(err) = self.prune_access_log().await {
                warn!(error = %err, "access log pruning failed");
            }
        }

        info!("reaper stopped");
    }
}
