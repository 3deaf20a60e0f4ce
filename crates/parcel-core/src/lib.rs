//! Core types and traits for the Parcel file-sharing service.
//!
//! This crate provides the domain model shared by the request path
//! (uploads, links, access recording), the quota ledger, the analytics
//! aggregator and the lifecycle reaper, together with the repository and
//! blob-store contracts that the storage crate implements.

pub mod access;
pub mod blob;
pub mod bucket;
pub mod clock;
pub mod content;
pub mod error;
pub mod ids;
pub mod link;
pub mod repository;
pub mod shortcode;
pub mod usage;

pub use access::{AccessKind, AccessLogEntry, AccessTarget, LogScope, RequestMeta};
pub use blob::{BlobDeletion, BlobPath, BlobStore};
pub use bucket::DailyBucket;
pub use clock::{Clock, ManualClock, SystemClock};
pub use content::{ContentItem, ExpirationPolicy, NewContent};
pub use error::{AdmissionDenied, BlobError, CoreError, StorageError};
pub use ids::{ContentId, LinkId, OwnerId};
pub use link::{NewLink, ShortLink};
pub use repository::{
    AccessLogStore, CodeLookup, ContentRepository, LinkRepository, UsageRepository,
};
pub use shortcode::{CodeStyle, ShortCode};
pub use usage::{ChargeOutcome, Limits, LiveUsage, UsageCounters, UsageDelta};
