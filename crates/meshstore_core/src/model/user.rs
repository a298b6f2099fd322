//! Users and their personal access tokens.
//!
//! # Invariants
//! - `PersonalAccessToken::hashed_token` is unique across the whole store.
//! - Tokens are keyed by token id inside `User::pats`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Role granted to a user inside its account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Admin,
    #[default]
    User,
}

/// Credential owned by a user. Only the hash is ever stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalAccessToken {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub hashed_token: String,
    /// Unix epoch milliseconds.
    pub expiration_date: i64,
    pub created_by: String,
    pub created_at: i64,
    pub last_used: i64,
}

/// Account member, either a human or a service user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub account_id: String,
    pub role: UserRole,
    pub is_service_user: bool,
    pub service_user_name: String,
    /// Groups automatically assigned to peers this user registers.
    pub auto_groups: Vec<String>,
    pub pats: HashMap<String, PersonalAccessToken>,
    pub blocked: bool,
    /// Unix epoch milliseconds.
    pub last_login: i64,
    /// Origin of the user record (`api`, `jwt`, ...).
    pub issued: String,
}

impl User {
    pub fn new(id: impl Into<String>, role: UserRole) -> Self {
        Self {
            id: id.into(),
            role,
            ..Self::default()
        }
    }
}
