//! Account use-case service.
//!
//! # Responsibility
//! - Wrap read-modify-write cycles on one account in its account lock.
//! - Route narrow field updates through the same lock as full saves.
//! - Own installation id bootstrap.
//!
//! # Invariants
//! - Every mutation of an account happens while its account lock is held.
//! - `update_account` saves only when the mutation closure succeeds.

use crate::model::account::Account;
use crate::model::peer::{PeerLocation, PeerStatus};
use crate::store::{AccountStore, StoreResult};
use log::info;
use uuid::Uuid;

/// Use-case service over any `AccountStore` implementation.
pub struct AccountService<S: AccountStore> {
    store: S,
}

impl<S: AccountStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads `account_id`, applies `mutate` and saves the result, all under
    /// the account lock. Returns the saved aggregate.
    pub fn update_account<F>(&self, account_id: &str, mutate: F) -> StoreResult<Account>
    where
        F: FnOnce(&mut Account) -> StoreResult<()>,
    {
        let _lock = self.store.acquire_account_lock(account_id);
        let mut account = self.store.get_account(account_id)?;
        mutate(&mut account)?;
        self.store.save_account(&account)?;
        Ok(account)
    }

    /// Saves a new or replacement aggregate under its account lock.
    pub fn save_account(&self, account: &Account) -> StoreResult<()> {
        let _lock = self.store.acquire_account_lock(&account.id);
        self.store.save_account(account)
    }

    /// Deletes `account_id` under its account lock.
    pub fn delete_account(&self, account_id: &str) -> StoreResult<()> {
        let _lock = self.store.acquire_account_lock(account_id);
        let account = self.store.get_account(account_id)?;
        self.store.delete_account(&account)
    }

    pub fn mark_peer_status(
        &self,
        account_id: &str,
        peer_id: &str,
        status: PeerStatus,
    ) -> StoreResult<()> {
        let _lock = self.store.acquire_account_lock(account_id);
        self.store.save_peer_status(account_id, peer_id, status)
    }

    pub fn update_peer_location(
        &self,
        account_id: &str,
        peer_id: &str,
        location: PeerLocation,
    ) -> StoreResult<()> {
        let _lock = self.store.acquire_account_lock(account_id);
        self.store.save_peer_location(account_id, peer_id, location)
    }

    pub fn record_user_login(
        &self,
        account_id: &str,
        user_id: &str,
        last_login: i64,
    ) -> StoreResult<()> {
        let _lock = self.store.acquire_account_lock(account_id);
        self.store.save_user_last_login(account_id, user_id, last_login)
    }

    /// Returns the stored installation id, generating and saving a new one
    /// under the global lock when none exists.
    pub fn ensure_installation_id(&self) -> StoreResult<String> {
        let _lock = self.store.acquire_global_lock();
        let existing = self.store.get_installation_id();
        if !existing.is_empty() {
            return Ok(existing);
        }

        let generated = Uuid::new_v4().to_string();
        self.store.save_installation_id(&generated)?;
        info!("event=installation_id_generated module=service status=ok");
        Ok(generated)
    }
}
