//! Advisory global and per-account locks.
//!
//! # Responsibility
//! - Serialize read-modify-write cycles on one account.
//! - Provide a process-wide lock for cross-account work.
//!
//! # Invariants
//! - Locks for distinct account ids never contend.
//! - A registry entry lives only while some caller holds or waits on it.
//! - Dropping a guard releases its lock; there is no other release path.

use crate::store::metrics::StoreMetrics;
use log::trace;
use parking_lot::{ArcMutexGuard, Mutex, MutexGuard, RawMutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Owner of the global lock and the per-account lock table.
pub struct LockRegistry {
    global: Mutex<()>,
    accounts: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    metrics: Option<Arc<dyn StoreMetrics>>,
}

impl LockRegistry {
    pub fn new(metrics: Option<Arc<dyn StoreMetrics>>) -> Self {
        Self {
            global: Mutex::new(()),
            accounts: Mutex::new(HashMap::new()),
            metrics,
        }
    }

    /// Blocks until the global lock is held. Wait time goes to the metrics
    /// sink.
    pub fn acquire_global(&self) -> GlobalLockGuard<'_> {
        trace!("event=global_lock module=store status=start");
        let requested_at = Instant::now();
        let guard = self.global.lock();

        let took = requested_at.elapsed();
        trace!(
            "event=global_lock module=store status=acquired wait_us={}",
            took.as_micros()
        );
        if let Some(metrics) = &self.metrics {
            metrics.count_global_lock_acquisition_duration(took);
        }

        GlobalLockGuard {
            _guard: guard,
            requested_at,
        }
    }

    /// Blocks until the lock for `account_id` is held, creating it on first
    /// use.
    pub fn acquire_account(&self, account_id: &str) -> AccountLockGuard<'_> {
        trace!("event=account_lock module=store status=start account_id={account_id}");
        let requested_at = Instant::now();

        let lock = {
            let mut accounts = self.accounts.lock();
            Arc::clone(accounts.entry(account_id.to_string()).or_default())
        };
        let guard = lock.lock_arc();
        drop(lock);

        trace!(
            "event=account_lock module=store status=acquired account_id={} wait_us={}",
            account_id,
            requested_at.elapsed().as_micros()
        );

        AccountLockGuard {
            registry: self,
            account_id: account_id.to_string(),
            guard: Some(guard),
            requested_at,
        }
    }

    /// Number of accounts that currently have a lock entry.
    pub fn tracked_accounts(&self) -> usize {
        self.accounts.lock().len()
    }

    fn reclaim(&self, account_id: &str) {
        let mut accounts = self.accounts.lock();
        // Clones are only taken under the table lock, so a count of one means
        // nobody holds or waits on this entry.
        if accounts
            .get(account_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            accounts.remove(account_id);
        }
    }
}

/// Held global lock. Released on drop.
pub struct GlobalLockGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    requested_at: Instant,
}

impl Drop for GlobalLockGuard<'_> {
    fn drop(&mut self) {
        trace!(
            "event=global_lock module=store status=released since_request_ms={}",
            self.requested_at.elapsed().as_millis()
        );
    }
}

/// Held account lock. Released on drop.
pub struct AccountLockGuard<'a> {
    registry: &'a LockRegistry,
    account_id: String,
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
    requested_at: Instant,
}

impl AccountLockGuard<'_> {
    pub fn account_id(&self) -> &str {
        &self.account_id
    }
}

impl Drop for AccountLockGuard<'_> {
    fn drop(&mut self) {
        // The guard owns its entry reference; release it before reclaiming.
        if let Some(guard) = self.guard.take() {
            drop(guard);
            self.registry.reclaim(&self.account_id);
        }
        trace!(
            "event=account_lock module=store status=released account_id={} since_request_ms={}",
            self.account_id,
            self.requested_at.elapsed().as_millis()
        );
    }
}
