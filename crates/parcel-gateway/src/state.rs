use parcel_analytics::{AnalyticsAggregator, AnalyticsLimits};
use parcel_core::{
    AccessLogStore, BlobStore, Clock, ContentRepository, LinkRepository, SystemClock,
    UsageRepository,
};
use parcel_generator::{AllocationError, AllocatorSettings};
use parcel_quota::{QuotaLedger, QuotaSettings};
use parcel_reaper::{LifecycleReaper, ReaperSettings};
use parcel_storage::{
    InMemoryAccessLog, InMemoryContentRepository, InMemoryLinkRepository,
    InMemoryUsageRepository, MemoryBlobStore,
};
use parcel_uploader::{AccessRecorder, LinkService, UploadService};
use std::sync::Arc;
use typed_builder::TypedBuilder;

pub type Ledger = QuotaLedger<dyn UsageRepository, dyn ContentRepository>;
pub type Uploads =
    UploadService<dyn ContentRepository, dyn UsageRepository, dyn BlobStore, dyn Clock>;
pub type Links = LinkService<dyn LinkRepository, dyn AccessLogStore, dyn Clock>;
pub type Access =
    AccessRecorder<dyn ContentRepository, dyn AccessLogStore, dyn BlobStore, dyn Clock>;
pub type Analytics = AnalyticsAggregator<dyn AccessLogStore, dyn ContentRepository, dyn Clock>;
pub type Reaper = LifecycleReaper<
    dyn ContentRepository,
    dyn UsageRepository,
    dyn BlobStore,
    dyn AccessLogStore,
    dyn Clock,
>;

/// The stores every service is built on.
#[derive(Clone)]
pub struct Backends {
    pub contents: Arc<dyn ContentRepository>,
    pub links: Arc<dyn LinkRepository>,
    pub usage: Arc<dyn UsageRepository>,
    pub access_log: Arc<dyn AccessLogStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub clock: Arc<dyn Clock>,
}

impl Backends {
    /// Everything in process memory, on the system clock.
    pub fn in_memory() -> Self {
        Self {
            contents: Arc::new(InMemoryContentRepository::new()),
            links: Arc::new(InMemoryLinkRepository::new()),
            usage: Arc::new(InMemoryUsageRepository::new()),
            access_log: Arc::new(InMemoryAccessLog::new()),
            blobs: Arc::new(MemoryBlobStore::new()),
            clock: Arc::new(SystemClock),
        }
    }
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct GatewaySettings {
    /// Prefix of the short URLs handed back to clients.
    #[builder(setter(into))]
    pub public_base_url: String,
    #[builder(default)]
    pub quota: QuotaSettings,
    #[builder(default)]
    pub allocator: AllocatorSettings,
    #[builder(default)]
    pub reaper: ReaperSettings,
    #[builder(default)]
    pub analytics: AnalyticsLimits,
}

#[derive(Clone)]
pub struct AppState {
    uploads: Arc<Uploads>,
    links: Arc<Links>,
    access: Arc<Access>,
    analytics: Arc<Analytics>,
    reaper: Arc<Reaper>,
    base_url: String,
}

impl AppState {
    pub fn new(backends: Backends, settings: GatewaySettings) -> Result<Self, AllocationError> {
        let ledger: Ledger = QuotaLedger::new(
            Arc::clone(&backends.usage),
            Arc::clone(&backends.contents),
            settings.quota,
        );

        let uploads = UploadService::new(
            Arc::clone(&backends.contents),
            ledger.clone(),
            Arc::clone(&backends.blobs),
            Arc::clone(&backends.clock),
            &settings.allocator,
        )?;
        let links = LinkService::new(
            Arc::clone(&backends.links),
            Arc::clone(&backends.access_log),
            Arc::clone(&backends.clock),
            &settings.allocator,
        )?;
        let access = AccessRecorder::new(
            Arc::clone(&backends.contents),
            Arc::clone(&backends.access_log),
            Arc::clone(&backends.blobs),
            Arc::clone(&backends.clock),
        );
        let analytics = AnalyticsAggregator::new(
            Arc::clone(&backends.access_log),
            Arc::clone(&backends.contents),
            Arc::clone(&backends.clock),
            settings.analytics,
        );
        let reaper = LifecycleReaper::new(
            backends.contents,
            ledger,
            backends.blobs,
            backends.access_log,
            backends.clock,
            settings.reaper,
        );

        Ok(Self {
            uploads: Arc::new(uploads),
            links: Arc::new(links),
            access: Arc::new(access),
            analytics: Arc::new(analytics),
            reaper: Arc::new(reaper),
            base_url: settings.public_base_url,
        })
    }

    pub fn uploads(&self) -> &Uploads {
        &self.uploads
    }

    pub fn ledger(&self) -> &Ledger {
        self.uploads.ledger()
    }

    pub fn links(&self) -> &Links {
        &self.links
    }

    pub fn access(&self) -> &Access {
        &self.access
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    /// The same reaper the periodic runner drives.
    pub fn reaper(&self) -> Arc<Reaper> {
        Arc::clone(&self.reaper)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
