use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter used to detect whether data cached from a
/// [`ParticleStore`](super::ParticleStore) is still valid.
///
/// The store owns the token, and every neighbor list built from this store
/// keeps a clone of it together with the value it had at build time. Any of
/// them can `advance` the token, which makes all lists sharing it stale at
/// once.
#[derive(Debug, Clone, Default)]
pub struct GenerationToken(Arc<AtomicU64>);

impl GenerationToken {
    /// Create a new token, starting at generation 0
    pub fn new() -> GenerationToken {
        GenerationToken::default()
    }

    /// Get the current value of this token
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Advance this token, returning the new generation
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Check if `self` and `other` are clones of the same token
    pub fn same_as(&self, other: &GenerationToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
