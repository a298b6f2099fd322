//! Full-replace persistence of one account aggregate.
//!
//! # Responsibility
//! - Remove every row owned by an account.
//! - Write the flat form of an account back in dependency order.
//!
//! # Invariants
//! - Callers run both steps inside one `IMMEDIATE` transaction.
//! - Parents are written before children so foreign keys always resolve.

use crate::store::batch::{batch_insert, upsert_row};
use crate::store::error::StoreResult;
use crate::store::translate::FlatAccount;
use rusqlite::Connection;

const DELETE_POLICY_RULES: &str =
    "DELETE FROM policy_rules WHERE policy_id IN (SELECT id FROM policies WHERE account_id = ?1);";
const DELETE_POLICIES: &str = "DELETE FROM policies WHERE account_id = ?1;";
const DELETE_TOKENS: &str =
    "DELETE FROM personal_access_tokens WHERE user_id IN (SELECT id FROM users WHERE account_id = ?1);";
const DELETE_USERS: &str = "DELETE FROM users WHERE account_id = ?1;";
const DELETE_ACCOUNT: &str = "DELETE FROM accounts WHERE id = ?1;";

/// Deletes rules and policies, then tokens and users, then the account row.
/// Remaining child tables cascade from the account row.
pub(crate) fn delete_account_rows(conn: &Connection, account_id: &str) -> StoreResult<()> {
    for sql in [
        DELETE_POLICY_RULES,
        DELETE_POLICIES,
        DELETE_TOKENS,
        DELETE_USERS,
        DELETE_ACCOUNT,
    ] {
        conn.prepare_cached(sql)?.execute([account_id])?;
    }
    Ok(())
}

/// Upserts the account row and batch-inserts every child collection.
pub(crate) fn insert_account(
    conn: &Connection,
    flat: &FlatAccount,
    batch_size: usize,
) -> StoreResult<()> {
    upsert_row(conn, &flat.account)?;
    batch_insert(conn, &flat.peers, batch_size)?;
    batch_insert(conn, &flat.users, batch_size)?;
    batch_insert(conn, &flat.tokens, batch_size)?;
    batch_insert(conn, &flat.groups, batch_size)?;
    batch_insert(conn, &flat.routes, batch_size)?;
    batch_insert(conn, &flat.setup_keys, batch_size)?;
    batch_insert(conn, &flat.name_server_groups, batch_size)?;
    batch_insert(conn, &flat.policies, batch_size)?;
    batch_insert(conn, &flat.rules, batch_size)?;
    Ok(())
}
