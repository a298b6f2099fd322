//! SQLite-backed `AccountStore`.
//!
//! # Responsibility
//! - Run full-replace saves and deletes in `IMMEDIATE` transactions.
//! - Rebuild aggregates from one consistent read snapshot.
//! - Resolve index lookups to an account id and reload through `get_account`.
//!
//! # Invariants
//! - Lookups and narrow updates log storage failures in full and return a
//!   sanitized `Internal` error.
//! - `save_account` and `delete_account` return storage failures unmodified.
//! - The installation id lives in the single row with id 1.

use crate::config::StoreConfig;
use crate::db::{open_db, open_db_in_memory, ConnectionPool, DbResult};
use crate::legacy::FileStore;
use crate::model::account::{Account, DomainCategory};
use crate::model::peer::{Peer, PeerLocation, PeerStatus};
use crate::model::user::User;
use crate::store::batch::{query_row_opt, update_row};
use crate::store::error::{sanitize, StoreError, StoreResult};
use crate::store::loader::{list_account_ids, load_account, load_user};
use crate::store::locks::{AccountLockGuard, GlobalLockGuard, LockRegistry};
use crate::store::metrics::StoreMetrics;
use crate::store::persist::{delete_account_rows, insert_account};
use crate::store::rows::{domain_category_to_db, TableRow};
use crate::store::translate::FlatAccount;
use crate::store::{AccountStore, StoreEngine};
use log::{debug, error, info, warn};
use rusqlite::{Connection, OptionalExtension, Params, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const INDEX_LOOKUP_FAILED: &str = "account not found: index lookup failed";
const INSTALLATION_ROW_ID: i64 = 1;

pub struct SqliteStore {
    pool: ConnectionPool,
    locks: LockRegistry,
    metrics: Option<Arc<dyn StoreMetrics>>,
    store_file: Option<PathBuf>,
    batch_size: usize,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `config.store_path()`.
    pub fn open(config: &StoreConfig, metrics: Option<Arc<dyn StoreMetrics>>) -> StoreResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;
        let store_file = config.store_path();

        let connections = (0..config.resolved_pool_size())
            .map(|_| open_db(&store_file, config.busy_timeout()))
            .collect::<DbResult<Vec<_>>>()?;

        info!(
            "event=store_open module=store status=ok path={} pool_size={}",
            store_file.display(),
            connections.len()
        );
        Ok(Self::from_connections(
            connections,
            metrics,
            Some(store_file),
            config.resolved_batch_size(),
        ))
    }

    /// Opens a private in-memory store backed by a single connection.
    pub fn open_in_memory(metrics: Option<Arc<dyn StoreMetrics>>) -> StoreResult<Self> {
        let conn = open_db_in_memory()?;
        Ok(Self::from_connections(
            vec![conn],
            metrics,
            None,
            StoreConfig::default().resolved_batch_size(),
        ))
    }

    /// Opens the store at `config` and replays a legacy file store into it:
    /// first the installation id, then every account.
    pub fn from_file_store(
        file_store: &FileStore,
        config: &StoreConfig,
        metrics: Option<Arc<dyn StoreMetrics>>,
    ) -> StoreResult<Self> {
        let store = Self::open(config, metrics)?;
        store.import(file_store)?;
        Ok(store)
    }

    /// Replays `file_store` into this store.
    pub fn import(&self, file_store: &FileStore) -> StoreResult<()> {
        let started_at = Instant::now();
        self.save_installation_id(&file_store.installation_id)?;
        for account in file_store.accounts.values() {
            self.save_account(account)?;
        }
        info!(
            "event=legacy_import module=store status=ok accounts={} duration_ms={}",
            file_store.accounts.len(),
            started_at.elapsed().as_millis()
        );
        Ok(())
    }

    fn from_connections(
        connections: Vec<Connection>,
        metrics: Option<Arc<dyn StoreMetrics>>,
        store_file: Option<PathBuf>,
        batch_size: usize,
    ) -> Self {
        Self {
            pool: ConnectionPool::new(connections),
            locks: LockRegistry::new(metrics.clone()),
            metrics,
            store_file,
            batch_size,
        }
    }

    /// Database file path; `None` for in-memory stores.
    pub fn store_file(&self) -> Option<&Path> {
        self.store_file.as_deref()
    }

    /// Number of accounts currently holding a lock registry entry.
    pub fn tracked_account_locks(&self) -> usize {
        self.locks.tracked_accounts()
    }

    /// Runs `f` inside a deferred transaction so every query sees one snapshot.
    fn read<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        self.transact(TransactionBehavior::Deferred, f)
    }

    /// Runs `f` inside an `IMMEDIATE` transaction; any error rolls back.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        self.transact(TransactionBehavior::Immediate, f)
    }

    fn transact<T>(
        &self,
        behavior: TransactionBehavior,
        f: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(behavior)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Reads the single scoping column selected by `sql`. A missing row or an
    /// empty value is `NotFound`.
    fn resolve_scope<P: Params>(
        &self,
        event: &str,
        entity: &str,
        sql: &str,
        params: P,
        not_found: &str,
    ) -> StoreResult<String> {
        let scope = self
            .read(|conn| {
                let mut stmt = conn.prepare_cached(sql)?;
                Ok(stmt.query_row(params, |row| row.get::<_, String>(0)).optional()?)
            })
            .map_err(|err| sanitize(event, entity, err))?;

        match scope {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(StoreError::NotFound(not_found.to_string())),
        }
    }

    /// Fetches the row `id` owned by `account_id`, applies `mutate`, and
    /// writes the row back.
    fn update_scoped<T: TableRow>(
        &self,
        event: &str,
        entity: &str,
        account_id: &str,
        id: &str,
        mutate: impl FnOnce(&mut T),
    ) -> StoreResult<()> {
        let not_found = || StoreError::NotFound(format!("{entity} {id} not found"));
        let result = self.write(|conn| {
            let mut row = query_row_opt::<T, _>(
                conn,
                "WHERE account_id = ?1 AND id = ?2",
                [account_id, id],
            )?
            .ok_or_else(not_found)?;
            mutate(&mut row);
            match update_row(conn, &row, "account_id", account_id)? {
                0 => Err(not_found()),
                _ => Ok(()),
            }
        });

        match result {
            Ok(()) => {
                debug!("event={event} module=store status=ok account_id={account_id} id={id}");
                Ok(())
            }
            Err(err) => Err(sanitize(event, entity, err)),
        }
    }

    fn record_persistence(&self, event: &str, account_id: &str, started_at: Instant) {
        let took = started_at.elapsed();
        debug!(
            "event={event} module=store status=ok account_id={account_id} duration_ms={}",
            took.as_millis()
        );
        if let Some(metrics) = &self.metrics {
            metrics.count_persistence_duration(took);
        }
    }
}

impl AccountStore for SqliteStore {
    fn acquire_global_lock(&self) -> GlobalLockGuard<'_> {
        self.locks.acquire_global()
    }

    fn acquire_account_lock(&self, account_id: &str) -> AccountLockGuard<'_> {
        self.locks.acquire_account(account_id)
    }

    fn save_account(&self, account: &Account) -> StoreResult<()> {
        let started_at = Instant::now();
        let flat = FlatAccount::from_account(account);

        let result = self.write(|conn| {
            delete_account_rows(conn, &account.id)?;
            insert_account(conn, &flat, self.batch_size)
        });

        match result {
            Ok(()) => {
                self.record_persistence("account_save", &account.id, started_at);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=account_save module=store status=error account_id={} duration_ms={} error={}",
                    account.id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn delete_account(&self, account: &Account) -> StoreResult<()> {
        let started_at = Instant::now();

        match self.write(|conn| delete_account_rows(conn, &account.id)) {
            Ok(()) => {
                self.record_persistence("account_delete", &account.id, started_at);
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=account_delete module=store status=error account_id={} duration_ms={} error={}",
                    account.id,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn get_account(&self, account_id: &str) -> StoreResult<Account> {
        self.read(|conn| load_account(conn, account_id))
            .and_then(|flat| {
                flat.ok_or_else(|| StoreError::NotFound(format!("account not found: {account_id}")))
            })
            .map(FlatAccount::into_account)
            .map_err(|err| sanitize("account_get", "account", err))
    }

    fn get_all_accounts(&self) -> Vec<Account> {
        let ids = match self.read(list_account_ids) {
            Ok(ids) => ids,
            Err(err) => {
                warn!("event=account_list module=store status=error error={err}");
                return Vec::new();
            }
        };

        ids.iter()
            .filter_map(|account_id| match self.get_account(account_id) {
                Ok(account) => Some(account),
                Err(err) => {
                    warn!(
                        "event=account_list module=store status=skipped account_id={account_id} error={err}"
                    );
                    None
                }
            })
            .collect()
    }

    fn get_account_by_private_domain(&self, domain: &str) -> StoreResult<Account> {
        let account_id = self.resolve_scope(
            "account_by_domain",
            "account",
            "SELECT id FROM accounts
             WHERE lower(domain) = ?1 AND is_domain_primary_account = 1 AND domain_category = ?2
             LIMIT 1;",
            [
                domain.to_lowercase().as_str(),
                domain_category_to_db(DomainCategory::Private),
            ],
            "account not found: provided domain is not registered or is not private",
        )?;
        self.get_account(&account_id)
    }

    fn get_account_by_setup_key(&self, setup_key: &str) -> StoreResult<Account> {
        let account_id = self.resolve_scope(
            "account_by_setup_key",
            "setup key",
            "SELECT account_id FROM setup_keys WHERE key = ?1;",
            [setup_key.to_uppercase()],
            INDEX_LOOKUP_FAILED,
        )?;
        self.get_account(&account_id)
    }

    fn get_account_by_user(&self, user_id: &str) -> StoreResult<Account> {
        let account_id = self.resolve_scope(
            "account_by_user",
            "user",
            "SELECT account_id FROM users WHERE id = ?1;",
            [user_id],
            INDEX_LOOKUP_FAILED,
        )?;
        self.get_account(&account_id)
    }

    fn get_account_by_peer_id(&self, peer_id: &str) -> StoreResult<Account> {
        let account_id = self.resolve_scope(
            "account_by_peer_id",
            "peer",
            "SELECT account_id FROM peers WHERE id = ?1;",
            [peer_id],
            INDEX_LOOKUP_FAILED,
        )?;
        self.get_account(&account_id)
    }

    fn get_account_by_peer_pub_key(&self, peer_key: &str) -> StoreResult<Account> {
        let account_id = self.resolve_scope(
            "account_by_peer_key",
            "peer",
            "SELECT account_id FROM peers WHERE key = ?1 LIMIT 1;",
            [peer_key],
            INDEX_LOOKUP_FAILED,
        )?;
        self.get_account(&account_id)
    }

    fn get_token_id_by_hashed_token(&self, hashed_token: &str) -> StoreResult<String> {
        self.resolve_scope(
            "token_by_hash",
            "token",
            "SELECT id FROM personal_access_tokens WHERE hashed_token = ?1;",
            [hashed_token],
            INDEX_LOOKUP_FAILED,
        )
    }

    fn get_user_by_token_id(&self, token_id: &str) -> StoreResult<User> {
        let user_id = self.resolve_scope(
            "user_by_token",
            "token",
            "SELECT user_id FROM personal_access_tokens WHERE id = ?1;",
            [token_id],
            INDEX_LOOKUP_FAILED,
        )?;

        self.read(|conn| load_user(conn, &user_id))
            .map_err(|err| sanitize("user_by_token", "user", err))?
            .ok_or_else(|| StoreError::NotFound(INDEX_LOOKUP_FAILED.to_string()))
    }

    fn save_peer_status(
        &self,
        account_id: &str,
        peer_id: &str,
        status: PeerStatus,
    ) -> StoreResult<()> {
        self.update_scoped::<Peer>("peer_status_save", "peer", account_id, peer_id, |peer| {
            peer.status = status;
        })
    }

    fn save_peer_location(
        &self,
        account_id: &str,
        peer_id: &str,
        location: PeerLocation,
    ) -> StoreResult<()> {
        self.update_scoped::<Peer>("peer_location_save", "peer", account_id, peer_id, |peer| {
            peer.location = location;
        })
    }

    fn save_user_last_login(
        &self,
        account_id: &str,
        user_id: &str,
        last_login: i64,
    ) -> StoreResult<()> {
        self.update_scoped::<User>("user_last_login_save", "user", account_id, user_id, |user| {
            user.last_login = last_login;
        })
    }

    fn save_installation_id(&self, installation_id: &str) -> StoreResult<()> {
        self.write(|conn| {
            conn.prepare_cached(
                "INSERT INTO installations (id, installation_id_value) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET installation_id_value = excluded.installation_id_value;",
            )?
            .execute(rusqlite::params![INSTALLATION_ROW_ID, installation_id])?;
            Ok(())
        })
    }

    fn get_installation_id(&self) -> String {
        let stored = self.read(|conn| {
            let mut stmt = conn
                .prepare_cached("SELECT installation_id_value FROM installations WHERE id = ?1;")?;
            Ok(stmt
                .query_row([INSTALLATION_ROW_ID], |row| row.get::<_, String>(0))
                .optional()?)
        });

        match stored {
            Ok(value) => value.unwrap_or_default(),
            Err(err) => {
                error!("event=installation_get module=store status=error error={err}");
                String::new()
            }
        }
    }

    fn close(&self) -> StoreResult<()> {
        self.pool.close()?;
        info!("event=store_close module=store status=ok");
        Ok(())
    }

    fn engine(&self) -> StoreEngine {
        StoreEngine::Sqlite
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteStore;
    use crate::config::StoreConfig;
    use crate::store::{AccountStore, StoreEngine};

    #[test]
    fn file_store_reopens_with_saved_state() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            pool_size: Some(2),
            ..StoreConfig::with_data_dir(dir.path().join("nested"))
        };

        let store = SqliteStore::open(&config, None).unwrap();
        assert_eq!(store.store_file(), Some(config.store_path().as_path()));
        store.save_installation_id("install-1").unwrap();
        store.close().unwrap();

        let reopened = SqliteStore::open(&config, None).unwrap();
        assert_eq!(reopened.get_installation_id(), "install-1");
        assert_eq!(reopened.engine(), StoreEngine::Sqlite);
    }

    #[test]
    fn closed_store_reports_errors_instead_of_panicking() {
        let store = SqliteStore::open_in_memory(None).unwrap();
        store.close().unwrap();

        assert!(store.get_account("acc-1").is_err());
        assert_eq!(store.get_installation_id(), "");
        assert!(store.get_all_accounts().is_empty());
    }
}
