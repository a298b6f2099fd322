//! Legacy flat-file account store.
//!
//! # Responsibility
//! - Parse the single-file JSON store used before the SQLite store existed.
//! - Hand its accounts and installation id to `SqliteStore::import`.
//!
//! # Invariants
//! - Parsing is read-only; the legacy file is never rewritten.
//! - Account map keys win over ids embedded in the account body.

use crate::model::account::Account;
use crate::store::{StoreError, StoreResult};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// File name the legacy store used inside its data directory.
pub const LEGACY_STORE_FILE: &str = "store.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStore {
    pub installation_id: String,
    pub accounts: HashMap<String, Account>,
}

impl FileStore {
    /// Reads and parses the legacy store file at `path`.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            StoreError::Legacy(format!("cannot read `{}`: {err}", path.display()))
        })?;
        let mut store: Self = serde_json::from_str(&raw).map_err(|err| {
            StoreError::Legacy(format!("cannot parse `{}`: {err}", path.display()))
        })?;

        for (id, account) in &mut store.accounts {
            account.id.clone_from(id);
        }

        info!(
            "event=legacy_load module=legacy status=ok path={} accounts={}",
            path.display(),
            store.accounts.len()
        );
        Ok(store)
    }

    /// Loads `store.json` from a legacy data directory.
    pub fn load_from_dir(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        Self::load(data_dir.as_ref().join(LEGACY_STORE_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::{FileStore, LEGACY_STORE_FILE};
    use crate::store::StoreError;

    #[test]
    fn load_applies_map_keys_as_account_ids() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(LEGACY_STORE_FILE),
            r#"{
                "installation_id": "install-1",
                "accounts": { "acc-1": { "id": "stale", "domain": "example.com" } }
            }"#,
        )
        .unwrap();

        let store = FileStore::load_from_dir(dir.path()).unwrap();
        assert_eq!(store.installation_id, "install-1");
        assert_eq!(store.accounts["acc-1"].id, "acc-1");
        assert_eq!(store.accounts["acc-1"].domain, "example.com");
    }

    #[test]
    fn missing_file_is_a_legacy_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileStore::load_from_dir(dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Legacy(_)));
    }
}
