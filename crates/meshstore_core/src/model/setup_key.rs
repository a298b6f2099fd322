//! Setup keys used to enroll peers without interactive login.
//!
//! # Invariants
//! - `key` is unique across all accounts and upper-case.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SetupKeyType {
    #[default]
    Reusable,
    OneOff,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupKey {
    pub id: String,
    pub account_id: String,
    pub key: String,
    pub name: String,
    pub key_type: SetupKeyType,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub expires_at: i64,
    pub updated_at: i64,
    pub revoked: bool,
    pub used_times: i64,
    pub last_used: i64,
    pub auto_groups: Vec<String>,
    /// Zero means unlimited.
    pub usage_limit: i64,
    pub ephemeral: bool,
}

impl SetupKey {
    pub fn new(id: impl Into<String>, key: &str, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            key: key.to_uppercase(),
            name: name.into(),
            ..Self::default()
        }
    }
}
