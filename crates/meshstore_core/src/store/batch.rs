//! Generic statement builders over `TableRow`.
//!
//! # Responsibility
//! - Multi-row batched inserts for child collections.
//! - Single-row upsert, scoped update and filtered selects.
//!
//! # Invariants
//! - Statements are prepared through the connection's statement cache.
//! - One statement never binds more than `MAX_BIND_VARIABLES` values.

use crate::store::error::{StoreError, StoreResult};
use crate::store::rows::TableRow;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Params};

/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` for bundled builds.
const MAX_BIND_VARIABLES: usize = 32_766;

/// Inserts `rows` in chunks of at most `batch_size` rows per statement.
///
/// The chunk size is additionally capped so a statement stays under the
/// bind variable limit for wide tables.
pub(crate) fn batch_insert<T: TableRow>(
    conn: &Connection,
    rows: &[T],
    batch_size: usize,
) -> StoreResult<()> {
    let chunk_size = batch_size
        .min(MAX_BIND_VARIABLES / T::COLUMNS.len())
        .max(1);

    for chunk in rows.chunks(chunk_size) {
        let mut bind_values = Vec::with_capacity(chunk.len() * T::COLUMNS.len());
        for row in chunk {
            bind_values.extend(checked_values(row)?);
        }

        let mut stmt = conn.prepare_cached(&insert_sql(T::TABLE, T::COLUMNS, chunk.len()))?;
        stmt.execute(params_from_iter(bind_values))?;
    }

    Ok(())
}

/// Inserts `row`, overwriting every column of an existing row with the same
/// primary key.
pub(crate) fn upsert_row<T: TableRow>(conn: &Connection, row: &T) -> StoreResult<()> {
    let assignments = T::COLUMNS[1..]
        .iter()
        .map(|column| format!("{column} = excluded.{column}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "{} ON CONFLICT({}) DO UPDATE SET {assignments};",
        insert_sql(T::TABLE, T::COLUMNS, 1).trim_end_matches(';'),
        T::COLUMNS[0],
    );

    let mut stmt = conn.prepare_cached(&sql)?;
    stmt.execute(params_from_iter(checked_values(row)?))?;
    Ok(())
}

/// Rewrites every non-key column of `row`, matching on primary key and
/// `scope_column = scope_value`. Returns the number of changed rows.
pub(crate) fn update_row<T: TableRow>(
    conn: &Connection,
    row: &T,
    scope_column: &str,
    scope_value: &str,
) -> StoreResult<usize> {
    let assignments = T::COLUMNS[1..]
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments} WHERE {} = ? AND {scope_column} = ?;",
        T::TABLE,
        T::COLUMNS[0],
    );

    let mut values = checked_values(row)?;
    let key = values.remove(0);
    values.push(key);
    values.push(Value::Text(scope_value.to_string()));

    let mut stmt = conn.prepare_cached(&sql)?;
    Ok(stmt.execute(params_from_iter(values))?)
}

/// Selects all rows of `T` matching `filter`, a `WHERE`/`ORDER BY` tail.
pub(crate) fn query_rows<T: TableRow, P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare_cached(&select_sql::<T>(filter))?;
    let mut rows = stmt.query(params)?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        items.push(T::from_row(row)?);
    }
    Ok(items)
}

/// Selects the first row of `T` matching `filter`, if any.
pub(crate) fn query_row_opt<T: TableRow, P: Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> StoreResult<Option<T>> {
    let mut stmt = conn.prepare_cached(&select_sql::<T>(filter))?;
    let mut rows = stmt.query(params)?;
    match rows.next()? {
        Some(row) => Ok(Some(T::from_row(row)?)),
        None => Ok(None),
    }
}

fn checked_values<T: TableRow>(row: &T) -> StoreResult<Vec<Value>> {
    let values = row.to_values()?;
    if values.len() != T::COLUMNS.len() {
        return Err(StoreError::MalformedBatch {
            table: T::TABLE,
            expected: T::COLUMNS.len(),
            actual: values.len(),
        });
    }
    Ok(values)
}

fn select_sql<T: TableRow>(filter: &str) -> String {
    format!("SELECT {} FROM {} {filter}", T::COLUMNS.join(", "), T::TABLE)
}

fn insert_sql(table: &str, columns: &[&str], row_count: usize) -> String {
    let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    format!(
        "INSERT INTO {table} ({}) VALUES {};",
        columns.join(", "),
        vec![placeholders; row_count].join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::{batch_insert, insert_sql, query_rows, update_row, upsert_row};
    use crate::db::open_db_in_memory;
    use crate::model::peer::Peer;
    use crate::store::error::{StoreError, StoreResult};
    use crate::store::rows::TableRow;
    use crate::store::translate::AccountRecord;
    use rusqlite::types::Value;
    use rusqlite::{Connection, Row};

    fn seed_account(conn: &Connection, id: &str) {
        let account = AccountRecord {
            id: id.to_string(),
            ..AccountRecord::default()
        };
        upsert_row(conn, &account).unwrap();
    }

    fn peer(index: usize) -> Peer {
        let mut peer = Peer::new(format!("peer-{index}"), format!("key-{index}"), "100.64.0.1");
        peer.account_id = "acc-1".to_string();
        peer
    }

    #[test]
    fn insert_sql_repeats_placeholder_groups() {
        assert_eq!(
            insert_sql("t", &["a", "b"], 2),
            "INSERT INTO t (a, b) VALUES (?, ?), (?, ?);"
        );
    }

    #[test]
    fn batch_insert_spans_multiple_statements() {
        let conn = open_db_in_memory().unwrap();
        seed_account(&conn, "acc-1");
        let peers = (0..7).map(peer).collect::<Vec<_>>();

        batch_insert(&conn, &peers, 3).unwrap();

        let stored: Vec<Peer> =
            query_rows(&conn, "WHERE account_id = ?1 ORDER BY id", ["acc-1"]).unwrap();
        assert_eq!(stored.len(), 7);
        assert_eq!(stored[0], peers[0]);
    }

    #[test]
    fn upsert_overwrites_existing_row() {
        let conn = open_db_in_memory().unwrap();
        seed_account(&conn, "acc-1");

        let updated = AccountRecord {
            id: "acc-1".to_string(),
            domain: "example.com".to_string(),
            ..AccountRecord::default()
        };
        upsert_row(&conn, &updated).unwrap();

        let stored: Vec<AccountRecord> = query_rows(&conn, "WHERE id = ?1", ["acc-1"]).unwrap();
        assert_eq!(stored, vec![updated]);
    }

    #[test]
    fn update_row_is_scoped_to_owner() {
        let conn = open_db_in_memory().unwrap();
        seed_account(&conn, "acc-1");
        let mut stored = peer(1);
        batch_insert(&conn, std::slice::from_ref(&stored), 500).unwrap();

        stored.name = "renamed".to_string();
        assert_eq!(update_row(&conn, &stored, "account_id", "acc-2").unwrap(), 0);
        assert_eq!(update_row(&conn, &stored, "account_id", "acc-1").unwrap(), 1);
    }

    struct ShortRow;

    impl TableRow for ShortRow {
        const TABLE: &'static str = "installations";
        const COLUMNS: &'static [&'static str] = &["id", "installation_id_value"];

        fn to_values(&self) -> StoreResult<Vec<Value>> {
            Ok(vec![Value::Integer(1)])
        }

        fn from_row(_row: &Row<'_>) -> StoreResult<Self> {
            Ok(Self)
        }
    }

    #[test]
    fn short_row_is_reported_not_panicked() {
        let conn = open_db_in_memory().unwrap();
        let err = batch_insert(&conn, &[ShortRow], 500).unwrap_err();
        assert!(matches!(
            err,
            StoreError::MalformedBatch {
                table: "installations",
                expected: 2,
                actual: 1
            }
        ));
    }
}
