//! Metrics sink consumed by the store.

use std::time::Duration;

/// Receives timing samples from the store. Implementations must be cheap and
/// non-blocking; they run on request threads.
pub trait StoreMetrics: Send + Sync {
    /// Time spent waiting for the global lock.
    fn count_global_lock_acquisition_duration(&self, duration: Duration);
    /// Time spent persisting or deleting one account aggregate.
    fn count_persistence_duration(&self, duration: Duration);
}
