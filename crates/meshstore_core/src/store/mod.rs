//! Account aggregate store.
//!
//! # Responsibility
//! - Define the `AccountStore` contract consumed by services.
//! - Provide the SQLite-backed implementation and its building blocks.
//!
//! # Invariants
//! - `save_account` replaces an account's full child state atomically.
//! - Account-returning lookups always rebuild through `get_account`.
//! - Locks are advisory; callers serialize their own read-modify-write
//!   cycles with `acquire_account_lock`.

use crate::model::account::Account;
use crate::model::peer::{PeerLocation, PeerStatus};
use crate::model::user::User;
use std::fmt::{Display, Formatter};

mod batch;
pub mod error;
mod loader;
pub mod locks;
pub mod metrics;
mod persist;
mod rows;
pub mod sqlite_store;
mod translate;

pub use error::{StoreError, StoreResult};
pub use locks::{AccountLockGuard, GlobalLockGuard, LockRegistry};
pub use metrics::StoreMetrics;
pub use sqlite_store::SqliteStore;

/// Storage backend behind an `AccountStore`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEngine {
    Sqlite,
}

impl Display for StoreEngine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Durable store of account aggregates.
pub trait AccountStore: Send + Sync {
    /// Blocks until the process-wide lock is held.
    fn acquire_global_lock(&self) -> GlobalLockGuard<'_>;
    /// Blocks until the lock for `account_id` is held.
    fn acquire_account_lock(&self, account_id: &str) -> AccountLockGuard<'_>;

    /// Replaces the stored state of `account` with the given aggregate.
    /// Storage failures are returned unsanitized.
    fn save_account(&self, account: &Account) -> StoreResult<()>;
    /// Removes the account and everything it owns.
    fn delete_account(&self, account: &Account) -> StoreResult<()>;
    fn get_account(&self, account_id: &str) -> StoreResult<Account>;
    /// Every account that loads successfully; failures are skipped.
    fn get_all_accounts(&self) -> Vec<Account>;

    fn get_account_by_private_domain(&self, domain: &str) -> StoreResult<Account>;
    fn get_account_by_setup_key(&self, setup_key: &str) -> StoreResult<Account>;
    fn get_account_by_user(&self, user_id: &str) -> StoreResult<Account>;
    fn get_account_by_peer_id(&self, peer_id: &str) -> StoreResult<Account>;
    fn get_account_by_peer_pub_key(&self, peer_key: &str) -> StoreResult<Account>;
    fn get_token_id_by_hashed_token(&self, hashed_token: &str) -> StoreResult<String>;
    /// Owning user of `token_id`, with `pats` populated.
    fn get_user_by_token_id(&self, token_id: &str) -> StoreResult<User>;

    /// Token indexes are derived from the token rows, so there is nothing
    /// to remove separately.
    fn delete_hashed_pat_to_token_id_index(&self, _hashed_token: &str) -> StoreResult<()> {
        Ok(())
    }
    fn delete_token_id_to_user_id_index(&self, _token_id: &str) -> StoreResult<()> {
        Ok(())
    }

    fn save_peer_status(&self, account_id: &str, peer_id: &str, status: PeerStatus)
        -> StoreResult<()>;
    fn save_peer_location(
        &self,
        account_id: &str,
        peer_id: &str,
        location: PeerLocation,
    ) -> StoreResult<()>;
    fn save_user_last_login(&self, account_id: &str, user_id: &str, last_login: i64)
        -> StoreResult<()>;

    fn save_installation_id(&self, installation_id: &str) -> StoreResult<()>;
    /// Stored installation id, or an empty string when none is stored.
    ///
    /// Read failures, including an unreadable stored value, are logged at
    /// error level and also reported as an empty string.
    fn get_installation_id(&self) -> String;

    fn close(&self) -> StoreResult<()>;
    fn engine(&self) -> StoreEngine;
}
