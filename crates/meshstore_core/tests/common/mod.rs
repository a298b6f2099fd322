#![allow(dead_code)]

use meshstore_core::model::account::{Account, DomainCategory};
use meshstore_core::model::group::Group;
use meshstore_core::model::nameserver::{NameServer, NameServerGroup};
use meshstore_core::model::peer::Peer;
use meshstore_core::model::policy::{Policy, PolicyRule, PolicyRuleProtocol};
use meshstore_core::model::route::Route;
use meshstore_core::model::setup_key::SetupKey;
use meshstore_core::model::user::{PersonalAccessToken, User, UserRole};
use meshstore_core::SqliteStore;

pub fn memory_store() -> SqliteStore {
    SqliteStore::open_in_memory(None).unwrap()
}

/// Account with every child collection populated. Globally unique values
/// (setup key, token hash) embed `id` so several fixtures can coexist.
pub fn full_account(id: &str) -> Account {
    let mut account = Account::new(id, "owner-1", &format!("{id}.example.com"));
    account.domain_category = DomainCategory::Private;
    account.is_domain_primary_account = true;
    account.created_at = 1_700_000_000_000;
    account.network.net = "100.64.0.0/10".to_string();
    account.network.serial = 3;
    account.settings.peer_login_expiration_enabled = true;
    account.settings.peer_login_expiration_ms = 86_400_000;
    account.dns_settings.disabled_management_groups = vec![format!("{id}-g1")];

    for index in 1..=2 {
        let peer_id = format!("{id}-p{index}");
        let mut peer = Peer::new(
            peer_id.clone(),
            format!("{id}-peer-key-{index}"),
            format!("100.64.0.{index}"),
        );
        peer.name = format!("host-{index}");
        peer.meta.os = "linux".to_string();
        peer.user_id = format!("{id}-u1");
        account.peers.insert(peer_id, peer);
    }

    let mut user = User::new(format!("{id}-u1"), UserRole::Owner);
    user.auto_groups = vec![format!("{id}-g1")];
    user.issued = "api".to_string();
    user.pats.insert(
        format!("{id}-t1"),
        PersonalAccessToken {
            id: format!("{id}-t1"),
            name: "ci".to_string(),
            hashed_token: format!("{id}-h1"),
            created_by: format!("{id}-u1"),
            ..PersonalAccessToken::default()
        },
    );
    account.users.insert(user.id.clone(), user);
    account.users.insert(
        format!("{id}-u2"),
        User::new(format!("{id}-u2"), UserRole::User),
    );

    account.groups.insert(
        format!("{id}-g1"),
        Group {
            id: format!("{id}-g1"),
            name: "All".to_string(),
            issued: "api".to_string(),
            peers: vec![format!("{id}-p1"), format!("{id}-p2")],
            ..Group::default()
        },
    );

    account.routes.insert(
        format!("{id}-r1"),
        Route {
            id: format!("{id}-r1"),
            network: "10.10.0.0/16".to_string(),
            net_id: "office".to_string(),
            peer: format!("{id}-p1"),
            metric: 9999,
            enabled: true,
            groups: vec![format!("{id}-g1")],
            ..Route::default()
        },
    );

    account.name_server_groups.insert(
        format!("{id}-ns1"),
        NameServerGroup {
            id: format!("{id}-ns1"),
            name: "google".to_string(),
            name_servers: vec![NameServer {
                ip: "8.8.8.8".to_string(),
                port: 53,
                ..NameServer::default()
            }],
            groups: vec![format!("{id}-g1")],
            primary: true,
            enabled: true,
            ..NameServerGroup::default()
        },
    );

    let setup_key = SetupKey::new(format!("{id}-k1"), &format!("{id}-setup-key"), "Default key");
    account.setup_keys.insert(setup_key.id.clone(), setup_key);

    account.policies.insert(
        format!("{id}-pol1"),
        Policy {
            id: format!("{id}-pol1"),
            name: "Default".to_string(),
            enabled: true,
            rules: vec![
                PolicyRule {
                    id: format!("{id}-rule-z"),
                    name: "first".to_string(),
                    enabled: true,
                    sources: vec![format!("{id}-g1")],
                    destinations: vec![format!("{id}-g1")],
                    bidirectional: true,
                    ..PolicyRule::default()
                },
                PolicyRule {
                    id: format!("{id}-rule-a"),
                    name: "second".to_string(),
                    protocol: PolicyRuleProtocol::Tcp,
                    ports: vec!["443".to_string()],
                    ..PolicyRule::default()
                },
            ],
            ..Policy::default()
        },
    );

    account
}

/// Copy of `account` with every foreign key, rule back-reference and setup
/// key normalized the way the store stamps them on write.
pub fn stamped(account: &Account) -> Account {
    let mut expected = account.clone();
    for peer in expected.peers.values_mut() {
        peer.account_id = account.id.clone();
    }
    for user in expected.users.values_mut() {
        user.account_id = account.id.clone();
        for token in user.pats.values_mut() {
            token.user_id = user.id.clone();
        }
    }
    for group in expected.groups.values_mut() {
        group.account_id = account.id.clone();
    }
    for route in expected.routes.values_mut() {
        route.account_id = account.id.clone();
    }
    for group in expected.name_server_groups.values_mut() {
        group.account_id = account.id.clone();
    }
    for key in expected.setup_keys.values_mut() {
        key.account_id = account.id.clone();
        key.key = key.key.to_uppercase();
    }
    for policy in expected.policies.values_mut() {
        policy.account_id = account.id.clone();
        for rule in &mut policy.rules {
            rule.policy_id = policy.id.clone();
        }
    }
    expected
}
