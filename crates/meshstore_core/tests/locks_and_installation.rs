mod common;

use common::memory_store;
use meshstore_core::{AccountStore, SqliteStore, StoreConfig, StoreMetrics};
use rusqlite::Connection;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
fn installation_id_is_a_singleton() {
    let store = memory_store();
    assert_eq!(store.get_installation_id(), "");

    store.save_installation_id("X").unwrap();
    assert_eq!(store.get_installation_id(), "X");

    store.save_installation_id("Y").unwrap();
    assert_eq!(store.get_installation_id(), "Y");
}

#[test]
fn unreadable_installation_id_reads_as_empty() {
    let data_dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::with_data_dir(data_dir.path());
    let store = SqliteStore::open(&config, None).unwrap();
    store.save_installation_id("install-1").unwrap();
    store.close().unwrap();

    let conn = Connection::open(config.store_path()).unwrap();
    conn.execute_batch("UPDATE installations SET installation_id_value = X'00';")
        .unwrap();
    drop(conn);

    let store = SqliteStore::open(&config, None).unwrap();
    assert_eq!(store.get_installation_id(), "");
    store.close().unwrap();
}

#[test]
fn distinct_account_locks_do_not_contend() {
    let store = Arc::new(memory_store());
    let _held = store.acquire_account_lock("acc1");

    let (tx, rx) = mpsc::channel();
    let other = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let _guard = store.acquire_account_lock("acc2");
            tx.send(()).unwrap();
        })
    };

    rx.recv_timeout(Duration::from_secs(5))
        .expect("lock on another account must not block");
    other.join().unwrap();
}

#[test]
fn same_account_lock_serializes_callers() {
    let store = Arc::new(memory_store());
    let held = store.acquire_account_lock("acc1");

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let store = Arc::clone(&store);
        thread::spawn(move || {
            let _guard = store.acquire_account_lock("acc1");
            tx.send(()).unwrap();
        })
    };

    assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());
    drop(held);
    rx.recv_timeout(Duration::from_secs(5))
        .expect("waiter should acquire after release");
    waiter.join().unwrap();
    assert_eq!(store.tracked_account_locks(), 0);
}

#[derive(Default)]
struct RecordingMetrics {
    lock_waits: AtomicUsize,
    persistence: AtomicUsize,
}

impl StoreMetrics for RecordingMetrics {
    fn count_global_lock_acquisition_duration(&self, _duration: Duration) {
        self.lock_waits.fetch_add(1, Ordering::SeqCst);
    }

    fn count_persistence_duration(&self, _duration: Duration) {
        self.persistence.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn metrics_receive_lock_and_persistence_samples() {
    let metrics = Arc::new(RecordingMetrics::default());
    let store = SqliteStore::open_in_memory(Some(metrics.clone())).unwrap();

    drop(store.acquire_global_lock());
    let account = common::full_account("acc1");
    store.save_account(&account).unwrap();
    store.delete_account(&account).unwrap();

    assert_eq!(metrics.lock_waits.load(Ordering::SeqCst), 1);
    assert_eq!(metrics.persistence.load(Ordering::SeqCst), 2);
}
