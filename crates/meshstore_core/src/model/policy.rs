//! Access control policies.
//!
//! # Invariants
//! - Rule order inside a policy is significant and preserved by storage.
//! - Every rule's `policy_id` equals its owning policy's id once persisted.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTrafficAction {
    #[default]
    Accept,
    Drop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyRuleProtocol {
    #[default]
    All,
    Tcp,
    Udp,
    Icmp,
}

/// Single match/allow statement of a policy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyRule {
    pub id: String,
    pub policy_id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub action: PolicyTrafficAction,
    /// Destination group ids.
    pub destinations: Vec<String>,
    /// Source group ids.
    pub sources: Vec<String>,
    pub bidirectional: bool,
    pub protocol: PolicyRuleProtocol,
    pub ports: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Policy {
    pub id: String,
    pub account_id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub rules: Vec<PolicyRule>,
    pub source_posture_checks: Vec<String>,
}
