use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameServerType {
    #[default]
    Udp,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameServer {
    pub ip: String,
    pub ns_type: NameServerType,
    pub port: u16,
}

/// DNS resolver set distributed to the peers of `groups`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NameServerGroup {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub description: String,
    pub name_servers: Vec<NameServer>,
    pub groups: Vec<String>,
    /// Resolves every domain when `true`, otherwise only `domains`.
    pub primary: bool,
    pub domains: Vec<String>,
    pub enabled: bool,
    pub search_domains_enabled: bool,
}
