//! Peer entity and its narrowly-updated sub-records.

use serde::{Deserialize, Serialize};

/// System information reported by the peer agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerSystemMeta {
    pub hostname: String,
    pub os: String,
    pub kernel: String,
    pub core: String,
    pub platform: String,
    pub os_version: String,
    pub agent_version: String,
    pub ui_version: String,
}

/// Connection status. Updated out-of-band through `save_peer_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerStatus {
    /// Unix epoch milliseconds.
    pub last_seen: i64,
    pub connected: bool,
    pub login_expired: bool,
    pub requires_approval: bool,
}

/// Geo location of the peer's last connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerLocation {
    pub connection_ip: String,
    pub country_code: String,
    pub city_name: String,
    pub geoname_id: i64,
}

/// Machine participating in an account's mesh network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Peer {
    pub id: String,
    pub account_id: String,
    /// WireGuard public key.
    pub key: String,
    /// Setup key used to register this peer, if any.
    pub setup_key: String,
    pub ip: String,
    pub meta: PeerSystemMeta,
    pub name: String,
    pub dns_label: String,
    pub status: PeerStatus,
    /// Owning user for interactively registered peers.
    pub user_id: String,
    pub ssh_key: String,
    pub ssh_enabled: bool,
    pub login_expiration_enabled: bool,
    /// Unix epoch milliseconds.
    pub last_login: i64,
    pub location: PeerLocation,
}

impl Peer {
    pub fn new(id: impl Into<String>, key: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            ip: ip.into(),
            ..Self::default()
        }
    }
}
