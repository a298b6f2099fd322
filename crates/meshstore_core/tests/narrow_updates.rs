mod common;

use common::{full_account, memory_store, stamped};
use meshstore_core::model::peer::{PeerLocation, PeerStatus};
use meshstore_core::{AccountStore, StoreError};

#[test]
fn peer_status_update_touches_only_status() {
    let store = memory_store();
    let account = full_account("acc1");
    store.save_account(&account).unwrap();

    let status = PeerStatus {
        last_seen: 1_700_000_123_000,
        connected: true,
        ..PeerStatus::default()
    };
    store
        .save_peer_status("acc1", "acc1-p1", status.clone())
        .unwrap();

    let mut expected = stamped(&account);
    expected.peers.get_mut("acc1-p1").unwrap().status = status;
    assert_eq!(store.get_account("acc1").unwrap(), expected);
}

#[test]
fn peer_location_update_touches_only_location() {
    let store = memory_store();
    let account = full_account("acc1");
    store.save_account(&account).unwrap();

    let location = PeerLocation {
        connection_ip: "203.0.113.7".to_string(),
        country_code: "DE".to_string(),
        city_name: "Berlin".to_string(),
        geoname_id: 2_950_159,
    };
    store
        .save_peer_location("acc1", "acc1-p2", location.clone())
        .unwrap();

    let loaded = store.get_account("acc1").unwrap();
    assert_eq!(loaded.peers["acc1-p2"].location, location);
    assert_eq!(loaded.peers["acc1-p2"].name, "host-2");
    assert_eq!(loaded.peers["acc1-p1"].location, PeerLocation::default());
}

#[test]
fn user_last_login_update_keeps_tokens() {
    let store = memory_store();
    store.save_account(&full_account("acc1")).unwrap();

    store
        .save_user_last_login("acc1", "acc1-u1", 1_700_000_999_000)
        .unwrap();

    let loaded = store.get_account("acc1").unwrap();
    let user = &loaded.users["acc1-u1"];
    assert_eq!(user.last_login, 1_700_000_999_000);
    assert_eq!(user.pats["acc1-t1"].hashed_token, "acc1-h1");
}

#[test]
fn updates_are_scoped_to_the_owning_account() {
    let store = memory_store();
    store.save_account(&full_account("acc1")).unwrap();
    store.save_account(&full_account("acc2")).unwrap();

    let err = store
        .save_peer_status("acc2", "acc1-p1", PeerStatus::default())
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));

    let err = store
        .save_user_last_login("acc1", "acc2-u1", 42)
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store
        .save_peer_location("acc1", "ghost", PeerLocation::default())
        .unwrap_err();
    assert!(err.is_not_found());
}
