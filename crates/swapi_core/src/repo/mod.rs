//! Repository layer over the statement capability set.
//!
//! # Responsibility
//! - Compose multi-table queries into nested domain objects.
//! - Separate request-level outcomes (`NotFound`, `Rejected`) from
//!   infrastructure failures (`Db`).
//!
//! # Invariants
//! - Repositories hold no state between calls; every call is a fresh round
//!   trip to the injected `Database`.
//! - Every prepared statement is dropped before the operation returns.

use crate::db::{Database, DbError, DbResult, ScannedRow};
use crate::model::person::PersonId;
use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod person_repo;
pub mod starship_repo;
pub mod vehicle_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Outcome of a failed repository call.
#[derive(Debug)]
pub enum RepoError {
    /// No person exists with the requested identifier.
    NotFound(PersonId),
    /// A mutating statement was refused by the store.
    Rejected(DbError),
    /// The highest stored identifier has no successor.
    IdentifiersExhausted(PersonId),
    /// Malformed query, cursor failure or undecodable row.
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "person not found: {id}"),
            Self::Rejected(err) => write!(f, "write rejected: {err}"),
            Self::IdentifiersExhausted(last) => {
                write!(f, "no identifier left after highest identifier {last}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotFound(_) | Self::IdentifiersExhausted(_) => None,
            Self::Rejected(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Runs `sql` and decodes every produced row with `decode`, in the order the
/// store yields them.
pub(crate) fn collect_rows<T>(
    db: &dyn Database,
    sql: &str,
    args: &[Value],
    decode: fn(&ScannedRow) -> DbResult<T>,
) -> RepoResult<Vec<T>> {
    let mut stmt = db.prepare(sql, args)?;
    let mut items = Vec::new();
    while stmt.step()? {
        let row = stmt.scan()?;
        items.push(decode(&row)?);
    }
    Ok(items)
}
