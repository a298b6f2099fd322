use serde::{Deserialize, Serialize};

/// Named set of peers used by routes, policies and DNS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub issued: String,
    /// Member peer ids.
    pub peers: Vec<String>,
}
