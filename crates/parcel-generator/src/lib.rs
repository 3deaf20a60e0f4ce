//! Short code generation and collision-checked allocation.

pub mod allocator;
pub mod error;
pub mod random;
pub mod seq;
pub mod words;

pub use allocator::{AllocatorSettings, ShortCodeAllocator};
pub use error::AllocationError;
pub use random::{RandomCode, ALPHANUMERIC};
pub use seq::SeqGenerator;
pub use words::WordPair;

use parcel_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage.
/// Uniqueness is the allocator's job, not the generator's.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}
