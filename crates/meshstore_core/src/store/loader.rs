//! Account aggregate loading.
//!
//! # Responsibility
//! - Read an account row and every child collection into a `FlatAccount`.
//! - Load standalone users with their tokens for index lookups.
//!
//! # Invariants
//! - Callers run these inside one read transaction so every query observes
//!   the same snapshot.
//! - Policy rules come back ordered by policy and position.

use crate::model::group::Group;
use crate::model::nameserver::NameServerGroup;
use crate::model::peer::Peer;
use crate::model::policy::Policy;
use crate::model::route::Route;
use crate::model::setup_key::SetupKey;
use crate::model::user::{PersonalAccessToken, User};
use crate::store::batch::{query_row_opt, query_rows};
use crate::store::error::StoreResult;
use crate::store::translate::{attach_tokens, AccountRecord, FlatAccount, PolicyRuleRecord};
use rusqlite::Connection;

/// Loads the flat form of `account_id`, or `None` when no account row exists.
pub(crate) fn load_account(conn: &Connection, account_id: &str) -> StoreResult<Option<FlatAccount>> {
    let Some(account) = query_row_opt::<AccountRecord, _>(conn, "WHERE id = ?1", [account_id])?
    else {
        return Ok(None);
    };

    let by_account = "WHERE account_id = ?1";
    let users: Vec<User> = query_rows(conn, by_account, [account_id])?;
    let tokens: Vec<PersonalAccessToken> = query_rows(
        conn,
        "WHERE user_id IN (SELECT id FROM users WHERE account_id = ?1)",
        [account_id],
    )?;
    let policies: Vec<Policy> = query_rows(conn, by_account, [account_id])?;

    Ok(Some(FlatAccount {
        account,
        peers: query_rows::<Peer, _>(conn, by_account, [account_id])?,
        users,
        tokens,
        groups: query_rows::<Group, _>(conn, by_account, [account_id])?,
        routes: query_rows::<Route, _>(conn, by_account, [account_id])?,
        name_server_groups: query_rows::<NameServerGroup, _>(conn, by_account, [account_id])?,
        setup_keys: query_rows::<SetupKey, _>(conn, by_account, [account_id])?,
        rules: load_policy_rules(conn, &policies)?,
        policies,
    }))
}

fn load_policy_rules(conn: &Connection, policies: &[Policy]) -> StoreResult<Vec<PolicyRuleRecord>> {
    let mut rules = Vec::new();
    for policy in policies {
        rules.extend(query_rows::<PolicyRuleRecord, _>(
            conn,
            "WHERE policy_id = ?1 ORDER BY position",
            [policy.id.as_str()],
        )?);
    }
    Ok(rules)
}

/// Loads one user with its `pats` populated.
pub(crate) fn load_user(conn: &Connection, user_id: &str) -> StoreResult<Option<User>> {
    let Some(user) = query_row_opt::<User, _>(conn, "WHERE id = ?1", [user_id])? else {
        return Ok(None);
    };
    let tokens: Vec<PersonalAccessToken> = query_rows(conn, "WHERE user_id = ?1", [user_id])?;
    Ok(attach_tokens(vec![user], tokens).pop())
}

pub(crate) fn list_account_ids(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare_cached("SELECT id FROM accounts ORDER BY id;")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}
