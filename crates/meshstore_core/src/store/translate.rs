//! Translation between the map-keyed aggregate and flat relational rows.
//!
//! # Responsibility
//! - Flatten an `Account` into per-table row sequences for persistence.
//! - Rebuild the `Account` maps from loaded row sequences.
//!
//! # Invariants
//! - Flattening works on a private copy; the caller's aggregate is untouched.
//! - Every flattened row's id is its map key and its foreign key is its
//!   owner's id, whatever the entity carried before.
//! - Policy rule order survives a round trip through `position`.
//! - Setup keys are stored upper-case, matching how lookups normalize input.

use crate::model::account::{Account, DnsSettings, DomainCategory, Network, Settings};
use crate::model::group::Group;
use crate::model::nameserver::NameServerGroup;
use crate::model::peer::Peer;
use crate::model::policy::{Policy, PolicyRule};
use crate::model::route::Route;
use crate::model::setup_key::SetupKey;
use crate::model::user::{PersonalAccessToken, User};
use std::collections::HashMap;

/// Scalar columns of the `accounts` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct AccountRecord {
    pub id: String,
    pub created_by: String,
    pub created_at: i64,
    pub domain: String,
    pub domain_category: DomainCategory,
    pub is_domain_primary_account: bool,
    pub network: Network,
    pub dns_settings: DnsSettings,
    pub settings: Settings,
}

/// Policy rule plus its index inside the owning policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct PolicyRuleRecord {
    pub position: i64,
    pub rule: PolicyRule,
}

/// Relational form of one account aggregate.
#[derive(Debug, Default)]
pub(crate) struct FlatAccount {
    pub account: AccountRecord,
    pub peers: Vec<Peer>,
    /// Users with `pats` emptied; tokens live in `tokens`.
    pub users: Vec<User>,
    pub tokens: Vec<PersonalAccessToken>,
    pub groups: Vec<Group>,
    pub routes: Vec<Route>,
    pub name_server_groups: Vec<NameServerGroup>,
    pub setup_keys: Vec<SetupKey>,
    /// Policies with `rules` emptied; rules live in `rules`.
    pub policies: Vec<Policy>,
    pub rules: Vec<PolicyRuleRecord>,
}

/// Entity stored in a map keyed by its own id and owned by a parent.
trait OwnedEntity: Clone {
    fn id(&self) -> &str;
    fn stamp(&mut self, id: &str, owner_id: &str);
}

macro_rules! owned_by_account {
    ($($entity:ty),+ $(,)?) => {
        $(
            impl OwnedEntity for $entity {
                fn id(&self) -> &str {
                    &self.id
                }

                fn stamp(&mut self, id: &str, owner_id: &str) {
                    self.id = id.to_string();
                    self.account_id = owner_id.to_string();
                }
            }
        )+
    };
}

owned_by_account!(Peer, User, Group, Route, NameServerGroup, SetupKey, Policy);

impl OwnedEntity for PersonalAccessToken {
    fn id(&self) -> &str {
        &self.id
    }

    fn stamp(&mut self, id: &str, owner_id: &str) {
        self.id = id.to_string();
        self.user_id = owner_id.to_string();
    }
}

fn flatten<T: OwnedEntity>(entities: &HashMap<String, T>, owner_id: &str) -> Vec<T> {
    entities
        .iter()
        .map(|(id, entity)| {
            let mut row = entity.clone();
            row.stamp(id, owner_id);
            row
        })
        .collect()
}

fn index<T: OwnedEntity>(rows: Vec<T>) -> HashMap<String, T> {
    rows.into_iter()
        .map(|row| (row.id().to_string(), row))
        .collect()
}

impl FlatAccount {
    /// Flattens `account` into stamped row sequences.
    pub fn from_account(account: &Account) -> Self {
        let account_id = account.id.as_str();

        let mut tokens = Vec::new();
        let mut users = flatten(&account.users, account_id);
        for user in &mut users {
            let pats = std::mem::take(&mut user.pats);
            tokens.extend(flatten(&pats, &user.id));
        }

        let mut rules = Vec::new();
        let mut policies = flatten(&account.policies, account_id);
        for policy in &mut policies {
            for (position, mut rule) in std::mem::take(&mut policy.rules).into_iter().enumerate() {
                rule.policy_id = policy.id.clone();
                rules.push(PolicyRuleRecord {
                    position: i64::try_from(position).unwrap_or(i64::MAX),
                    rule,
                });
            }
        }

        let mut setup_keys = flatten(&account.setup_keys, account_id);
        for setup_key in &mut setup_keys {
            setup_key.key = setup_key.key.to_uppercase();
        }

        Self {
            account: AccountRecord {
                id: account.id.clone(),
                created_by: account.created_by.clone(),
                created_at: account.created_at,
                domain: account.domain.clone(),
                domain_category: account.domain_category,
                is_domain_primary_account: account.is_domain_primary_account,
                network: account.network.clone(),
                dns_settings: account.dns_settings.clone(),
                settings: account.settings.clone(),
            },
            peers: flatten(&account.peers, account_id),
            users,
            tokens,
            groups: flatten(&account.groups, account_id),
            routes: flatten(&account.routes, account_id),
            name_server_groups: flatten(&account.name_server_groups, account_id),
            setup_keys,
            policies,
            rules,
        }
    }

    /// Rebuilds the map-keyed aggregate, consuming the flat rows.
    pub fn into_account(self) -> Account {
        let record = self.account;
        Account {
            id: record.id,
            created_by: record.created_by,
            created_at: record.created_at,
            domain: record.domain,
            domain_category: record.domain_category,
            is_domain_primary_account: record.is_domain_primary_account,
            network: record.network,
            dns_settings: record.dns_settings,
            settings: record.settings,
            setup_keys: index(self.setup_keys),
            peers: index(self.peers),
            users: index(attach_tokens(self.users, self.tokens)),
            groups: index(self.groups),
            routes: index(self.routes),
            name_server_groups: index(self.name_server_groups),
            policies: index(attach_rules(self.policies, self.rules)),
        }
    }
}

/// Moves each token into its owning user's `pats`. Tokens without a loaded
/// owner are dropped.
pub(crate) fn attach_tokens(mut users: Vec<User>, tokens: Vec<PersonalAccessToken>) -> Vec<User> {
    let mut by_user: HashMap<String, Vec<PersonalAccessToken>> = HashMap::new();
    for token in tokens {
        by_user.entry(token.user_id.clone()).or_default().push(token);
    }
    for user in &mut users {
        user.pats = index(by_user.remove(&user.id).unwrap_or_default());
    }
    users
}

fn attach_rules(mut policies: Vec<Policy>, rules: Vec<PolicyRuleRecord>) -> Vec<Policy> {
    let mut by_policy: HashMap<String, Vec<PolicyRuleRecord>> = HashMap::new();
    for record in rules {
        by_policy
            .entry(record.rule.policy_id.clone())
            .or_default()
            .push(record);
    }
    for policy in &mut policies {
        let mut records = by_policy.remove(&policy.id).unwrap_or_default();
        records.sort_by_key(|record| record.position);
        policy.rules = records.into_iter().map(|record| record.rule).collect();
    }
    policies
}
