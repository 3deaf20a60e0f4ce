//! [`BlobStore`](parcel_core::BlobStore) backends.

mod fs;
mod memory;

pub use fs::FsBlobStore;
pub use memory::MemoryBlobStore;

use std::path::Path;
use uuid::Uuid;

/// Extension used when the client name has none or a suspicious one.
const FALLBACK_EXTENSION: &str = "bin";
const MAX_EXTENSION_LEN: usize = 10;

/// Picks a safe extension from a client-supplied file name.
fn extension_of(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string())
}

/// A fresh `{uuid}.{ext}` name for a new blob.
fn stored_name(file_name: &str) -> String {
    format!("{}.{}", Uuid::new_v4(), extension_of(file_name))
}

/// Whether `name` looks like something [`stored_name`] produced.
fn is_stored_name(name: &str) -> bool {
    name.len() > 2
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}
