//! Store error taxonomy.
//!
//! # Invariants
//! - `NotFound` and `Internal` messages never carry SQL or schema detail.
//! - `Db` carries the raw storage error and is only produced by the
//!   full-aggregate write paths and bootstrap.

use crate::db::DbError;
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Target row, or the row an index lookup depends on, does not exist.
    NotFound(String),
    /// Sanitized storage failure; full detail was logged at the failure site.
    Internal(String),
    /// Raw storage failure, returned unmodified.
    Db(DbError),
    /// A batch row bound a different number of values than its table has
    /// columns.
    MalformedBatch {
        table: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A value could not be encoded for, or decoded from, storage.
    InvalidData(String),
    /// Legacy file store could not be read.
    Legacy(String),
    /// Data directory could not be prepared.
    Io(std::io::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(message) => write!(f, "not found: {message}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::MalformedBatch {
                table,
                expected,
                actual,
            } => write!(
                f,
                "malformed batch row for `{table}`: expected {expected} values, got {actual}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Legacy(message) => write!(f, "legacy store error: {message}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Logs `err` in full and returns a coarse `Internal` error for the caller.
///
/// `NotFound` passes through untouched so lookups keep their semantics.
pub(crate) fn sanitize(event: &str, entity: &str, err: StoreError) -> StoreError {
    if err.is_not_found() {
        return err;
    }
    error!("event={event} module=store status=error entity={entity} error={err}");
    StoreError::Internal(format!("issue getting {entity} from store"))
}
