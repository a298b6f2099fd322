//! Fixed-size SQLite connection pool.
//!
//! # Invariants
//! - A connection is used by at most one thread at a time.
//! - After `close` no connection is handed out again.

use super::{DbError, DbResult};
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Exclusive handle to one pooled connection; returned to the pool on drop.
pub type PooledConnection<'pool> = MappedMutexGuard<'pool, Connection>;

pub struct ConnectionPool {
    slots: Vec<Mutex<Option<Connection>>>,
    cursor: AtomicUsize,
}

impl ConnectionPool {
    /// Builds a pool from already bootstrapped connections.
    pub fn new(connections: Vec<Connection>) -> Self {
        Self {
            slots: connections
                .into_iter()
                .map(|conn| Mutex::new(Some(conn)))
                .collect(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Returns an idle connection, blocking on a round-robin slot when all
    /// connections are busy.
    pub fn get(&self) -> DbResult<PooledConnection<'_>> {
        if self.slots.is_empty() {
            return Err(DbError::Closed);
        }
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % self.slots.len();

        for offset in 0..self.slots.len() {
            let slot = &self.slots[(start + offset) % self.slots.len()];
            if let Some(guard) = slot.try_lock() {
                return checkout(guard);
            }
        }

        checkout(self.slots[start].lock())
    }

    /// Closes every connection, waiting for connections in use to be
    /// released first. Reports the first close failure.
    pub fn close(&self) -> DbResult<()> {
        let mut first_error = None;
        for slot in &self.slots {
            if let Some(conn) = slot.lock().take() {
                if let Err((_, err)) = conn.close() {
                    first_error.get_or_insert(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(DbError::Sqlite(err)),
            None => Ok(()),
        }
    }
}

fn checkout(guard: MutexGuard<'_, Option<Connection>>) -> DbResult<PooledConnection<'_>> {
    MutexGuard::try_map(guard, Option::as_mut).map_err(|_| DbError::Closed)
}
