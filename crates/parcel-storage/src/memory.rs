//! In-memory stores backed by `DashMap`.
//!
//! Atomicity comes from holding the map's per-key lock for the duration of a
//! read-modify-write, which is enough for a single process.

mod access_log;
mod content;
mod link;
mod usage;

pub use access_log::InMemoryAccessLog;
pub use content::InMemoryContentRepository;
pub use link::InMemoryLinkRepository;
pub use usage::InMemoryUsageRepository;
