//! The request path: uploads, short links and access recording.
//!
//! Each service owns the ordering of its steps (admission, blob writes,
//! code allocation, inserts) and undoes partial work when a later step
//! fails. Storage, quota and code generation come from the other crates.

pub mod access;
pub mod error;
pub mod link;
pub mod upload;

pub use access::{AccessRecorder, OpenedContent};
pub use error::{AccessError, LinkError, UploadError};
pub use link::LinkService;
pub use upload::{UploadRequest, UploadService};

/// Inserts attempted before giving up on a code that keeps being taken
/// between allocation and insert.
pub const MAX_INSERT_ATTEMPTS: usize = 3;
