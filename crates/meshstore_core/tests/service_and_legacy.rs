mod common;

use common::{full_account, memory_store, stamped};
use meshstore_core::legacy::LEGACY_STORE_FILE;
use meshstore_core::model::peer::PeerStatus;
use meshstore_core::model::setup_key::SetupKey;
use meshstore_core::{
    AccountService, AccountStore, FileStore, SqliteStore, StoreConfig, StoreError,
};
use rusqlite::Connection;
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

#[test]
fn update_account_saves_mutation_under_lock() {
    let service = AccountService::new(memory_store());
    service.save_account(&full_account("acc1")).unwrap();

    let updated = service
        .update_account("acc1", |account| {
            account.peers.remove("acc1-p2");
            Ok(())
        })
        .unwrap();

    let loaded = service.store().get_account("acc1").unwrap();
    assert_eq!(loaded, updated);
    assert_eq!(loaded.peers.len(), 1);
    assert_eq!(service.store().tracked_account_locks(), 0);
}

#[test]
fn failed_mutation_leaves_stored_account_untouched() {
    let service = AccountService::new(memory_store());
    let account = full_account("acc1");
    service.save_account(&account).unwrap();

    let err = service
        .update_account("acc1", |account| {
            account.peers.clear();
            Err(StoreError::InvalidData("rejected".to_string()))
        })
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidData(_)));
    assert_eq!(service.store().get_account("acc1").unwrap(), stamped(&account));
}

#[test]
fn concurrent_updates_to_one_account_are_not_lost() {
    let service = Arc::new(AccountService::new(memory_store()));
    service.save_account(&full_account("acc1")).unwrap();

    let workers = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                for _ in 0..5 {
                    service
                        .update_account("acc1", |account| {
                            account.network.serial += 1;
                            Ok(())
                        })
                        .unwrap();
                }
            })
        })
        .collect::<Vec<_>>();
    for worker in workers {
        worker.join().unwrap();
    }

    let loaded = service.store().get_account("acc1").unwrap();
    assert_eq!(loaded.network.serial, 3 + 40);
}

#[test]
fn locked_narrow_update_and_delete() {
    let service = AccountService::new(memory_store());
    service.save_account(&full_account("acc1")).unwrap();

    service
        .mark_peer_status(
            "acc1",
            "acc1-p1",
            PeerStatus {
                connected: true,
                ..PeerStatus::default()
            },
        )
        .unwrap();
    service.record_user_login("acc1", "acc1-u2", 77).unwrap();
    let account = service.store().get_account("acc1").unwrap();
    assert!(account.peers["acc1-p1"].status.connected);
    assert_eq!(account.users["acc1-u2"].last_login, 77);

    service.delete_account("acc1").unwrap();
    assert!(service.store().get_account("acc1").unwrap_err().is_not_found());
    assert!(service.delete_account("acc1").unwrap_err().is_not_found());
}

#[test]
fn ensure_installation_id_generates_once() {
    let service = AccountService::new(memory_store());

    let first = service.ensure_installation_id().unwrap();
    assert_eq!(first.len(), 36);
    assert_eq!(service.ensure_installation_id().unwrap(), first);
    assert_eq!(service.store().get_installation_id(), first);
}

#[test]
fn legacy_file_store_is_replayed_into_sqlite() {
    let legacy_dir = tempfile::tempdir().unwrap();
    let data_dir = tempfile::tempdir().unwrap();

    let legacy = FileStore {
        installation_id: "legacy-install".to_string(),
        accounts: ["acc1", "acc2"]
            .into_iter()
            .map(|id| (id.to_string(), full_account(id)))
            .collect::<HashMap<_, _>>(),
    };
    std::fs::write(
        legacy_dir.path().join(LEGACY_STORE_FILE),
        serde_json::to_string_pretty(&legacy).unwrap(),
    )
    .unwrap();

    let loaded = FileStore::load_from_dir(legacy_dir.path()).unwrap();
    let config = StoreConfig::with_data_dir(data_dir.path());
    let store = SqliteStore::from_file_store(&loaded, &config, None).unwrap();

    assert_eq!(store.get_installation_id(), "legacy-install");
    for (id, account) in &legacy.accounts {
        assert_eq!(store.get_account(id).unwrap(), stamped(account));
    }
    store.close().unwrap();
}

#[test]
fn legacy_lowercase_setup_key_is_found_after_import() {
    let data_dir = tempfile::tempdir().unwrap();
    let mut account = full_account("acc1");
    account.setup_keys.insert(
        "acc1-k2".to_string(),
        SetupKey {
            key: "legacy-key".to_string(),
            ..SetupKey::default()
        },
    );
    let raw = serde_json::to_string(&FileStore {
        installation_id: String::new(),
        accounts: HashMap::from([("acc1".to_string(), account)]),
    })
    .unwrap();
    let legacy: FileStore = serde_json::from_str(&raw).unwrap();
    assert_eq!(legacy.accounts["acc1"].setup_keys["acc1-k2"].key, "legacy-key");

    let config = StoreConfig::with_data_dir(data_dir.path());
    let store = SqliteStore::from_file_store(&legacy, &config, None).unwrap();

    assert_eq!(store.get_account_by_setup_key("legacy-key").unwrap().id, "acc1");
    assert_eq!(store.get_account_by_setup_key("LEGACY-KEY").unwrap().id, "acc1");
    store.close().unwrap();
}

#[test]
fn delete_leaves_no_rows_referencing_the_account() {
    let data_dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::with_data_dir(data_dir.path());
    let store = SqliteStore::open(&config, None).unwrap();
    let account = full_account("acc1");
    store.save_account(&account).unwrap();
    store.save_account(&full_account("acc2")).unwrap();

    store.delete_account(&account).unwrap();
    store.close().unwrap();

    let conn = Connection::open(config.store_path()).unwrap();
    let count = |sql: &str| -> i64 { conn.query_row(sql, [], |row| row.get(0)).unwrap() };
    assert_eq!(count("SELECT COUNT(*) FROM policies WHERE account_id = 'acc1';"), 0);
    assert_eq!(
        count("SELECT COUNT(*) FROM policy_rules WHERE policy_id = 'acc1-pol1';"),
        0
    );
    assert_eq!(count("SELECT COUNT(*) FROM users WHERE account_id = 'acc1';"), 0);
    assert_eq!(
        count("SELECT COUNT(*) FROM personal_access_tokens WHERE user_id LIKE 'acc1-%';"),
        0
    );
    assert_eq!(count("SELECT COUNT(*) FROM peers WHERE account_id = 'acc1';"), 0);
    assert_eq!(count("SELECT COUNT(*) FROM accounts;"), 1);
}
