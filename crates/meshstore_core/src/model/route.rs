use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    #[default]
    Ipv4,
    Ipv6,
}

/// Network route advertised by a routing peer or peer group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Route {
    pub id: String,
    pub account_id: String,
    /// Routed prefix in CIDR notation.
    pub network: String,
    /// High-availability group identifier shared by redundant routes.
    pub net_id: String,
    pub description: String,
    /// Routing peer id. Mutually exclusive with `peer_groups`.
    pub peer: String,
    pub peer_groups: Vec<String>,
    pub network_type: NetworkType,
    pub masquerade: bool,
    pub metric: i32,
    pub enabled: bool,
    /// Distribution groups receiving this route.
    pub groups: Vec<String>,
}
