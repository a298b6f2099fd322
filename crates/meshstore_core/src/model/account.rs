//! Account aggregate root.
//!
//! # Responsibility
//! - Define the per-tenant aggregate owning every child collection.
//! - Hold account-scoped scalar configuration (domain, network, settings).
//!
//! # Invariants
//! - Child collections are keyed by the child's own id.
//! - Every child's foreign key equals `Account::id` once persisted.

use crate::model::group::Group;
use crate::model::nameserver::NameServerGroup;
use crate::model::peer::Peer;
use crate::model::policy::Policy;
use crate::model::route::Route;
use crate::model::setup_key::SetupKey;
use crate::model::user::User;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stable, opaque account identifier.
pub type AccountId = String;

/// Whether an account's domain is a private (company) or public (shared
/// identity provider) domain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainCategory {
    Private,
    Public,
    /// Domain has not been classified yet.
    #[default]
    #[serde(rename = "")]
    Unclassified,
}

/// Overlay network allocated to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Network {
    pub identifier: String,
    /// CIDR notation, e.g. `100.64.0.0/10`.
    pub net: String,
    pub dns: String,
    /// Bumped on every network map change.
    pub serial: i64,
}

/// DNS management settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsSettings {
    /// Group ids whose peers have DNS management disabled.
    pub disabled_management_groups: Vec<String>,
}

/// Settings that were added after the base settings shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtraSettings {
    pub peer_approval_enabled: bool,
}

/// Account-wide behavioural settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub peer_login_expiration_enabled: bool,
    /// Milliseconds after which a peer login expires.
    pub peer_login_expiration_ms: i64,
    pub regular_users_view_blocked: bool,
    pub groups_propagation_enabled: bool,
    pub jwt_groups_enabled: bool,
    pub jwt_groups_claim_name: String,
    pub extra: ExtraSettings,
}

/// Full in-memory configuration graph of one mesh network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub id: AccountId,
    pub created_by: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub domain: String,
    pub domain_category: DomainCategory,
    pub is_domain_primary_account: bool,
    pub network: Network,
    pub dns_settings: DnsSettings,
    pub settings: Settings,
    pub setup_keys: HashMap<String, SetupKey>,
    pub peers: HashMap<String, Peer>,
    pub users: HashMap<String, User>,
    pub groups: HashMap<String, Group>,
    pub routes: HashMap<String, Route>,
    pub name_server_groups: HashMap<String, NameServerGroup>,
    pub policies: HashMap<String, Policy>,
}

impl Account {
    /// Creates an empty account with the given id and domain.
    pub fn new(id: impl Into<AccountId>, created_by: impl Into<String>, domain: &str) -> Self {
        Self {
            id: id.into(),
            created_by: created_by.into(),
            domain: domain.to_lowercase(),
            ..Self::default()
        }
    }
}
