//! Storage capability contracts and SQLite bootstrap.
//!
//! # Responsibility
//! - Define the minimal statement capability set repositories depend on:
//!   prepare, step, scan, exec, and release on drop.
//! - Open and configure SQLite connections backing that capability set.
//!
//! # Invariants
//! - Repositories never touch `rusqlite::Connection` directly; they only see
//!   `&dyn Database`, so a scripted double can stand in for SQLite.
//! - A prepared statement is released when its box is dropped, on every exit
//!   path of the operation that opened it.
//! - Connections wait at most 5 seconds on a locked database.

use rusqlite::types::{FromSql, Value, ValueRef};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;
pub mod schema;
mod sqlite;

pub use open::{open_db, open_db_in_memory};
pub use sqlite::SqliteDatabase;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    /// A column of the current row is missing or has an unexpected type.
    Decode {
        column: usize,
        message: String,
    },
    /// `scan` was called before `step` produced a row.
    NoCurrentRow,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Decode { column, message } => {
                write!(f, "failed to decode column {column}: {message}")
            }
            Self::NoCurrentRow => write!(f, "statement has no current row"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Decode { .. } => None,
            Self::NoCurrentRow => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// A storage handle able to prepare statements with positional arguments.
pub trait Database {
    /// Prepares `sql`, binding `args` for row-producing execution via `step`.
    fn prepare<'a>(&'a self, sql: &str, args: &[Value]) -> DbResult<Box<dyn Statement + 'a>>;
}

/// Cursor over one prepared statement.
///
/// Dropping the statement releases its resources.
pub trait Statement {
    /// Advances to the next row. Returns `false` once the rows are exhausted.
    fn step(&mut self) -> DbResult<bool>;
    /// Returns the current row's columns in column order.
    fn scan(&self) -> DbResult<ScannedRow>;
    /// Runs a non-row-producing statement and returns the changed row count.
    fn exec(&mut self, args: &[Value]) -> DbResult<usize>;
}

/// Column values of one row, decoded by position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannedRow {
    values: Vec<Value>,
}

impl ScannedRow {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Decodes column `column` into `T`.
    ///
    /// # Errors
    /// - `DbError::Decode` when the column is absent or cannot convert to `T`.
    pub fn get<T: FromSql>(&self, column: usize) -> DbResult<T> {
        let value = self.values.get(column).ok_or_else(|| DbError::Decode {
            column,
            message: format!("row has only {} columns", self.values.len()),
        })?;
        T::column_result(ValueRef::from(value)).map_err(|err| DbError::Decode {
            column,
            message: err.to_string(),
        })
    }
}

/// Prepares and executes one non-row-producing statement without arguments.
pub fn exec_batch_statement(db: &dyn Database, sql: &str) -> DbResult<usize> {
    let mut stmt = db.prepare(sql, &[])?;
    stmt.exec(&[])
}
