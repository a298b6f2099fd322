//! Durable account aggregate store for a mesh VPN control plane.
//! Callers load an account, mutate it under its lock and save it back whole.

pub mod config;
pub mod db;
pub mod legacy;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{ConfigError, StoreConfig};
pub use legacy::FileStore;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::account::{Account, AccountId};
pub use service::account_service::AccountService;
pub use store::{
    AccountLockGuard, AccountStore, GlobalLockGuard, SqliteStore, StoreEngine, StoreError,
    StoreMetrics, StoreResult,
};

/// Minimal health-check API for hosts.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
