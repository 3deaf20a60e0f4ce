//! Storage backends for content rows, short links, usage counters, the
//! access log and uploaded bytes.
//!
//! Every store comes in two flavours: an in-memory one used by tests and
//! single-node deployments, and a MySQL one for production.

pub mod blob;
pub mod memory;
pub mod mysql;

pub use blob::{FsBlobStore, MemoryBlobStore};
pub use memory::{
    InMemoryAccessLog, InMemoryContentRepository, InMemoryLinkRepository,
    InMemoryUsageRepository,
};
pub use mysql::{
    MySqlAccessLog, MySqlContentRepository, MySqlLinkRepository, MySqlUsageRepository,
};
