//! SQLite implementation of the statement capability set.
//!
//! # Invariants
//! - Query rows are read on the first `step` and yielded one at a time after.
//! - `exec` binds only its own arguments; `prepare` arguments belong to `step`.

use super::{Database, DbError, DbResult, ScannedRow, Statement};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::collections::VecDeque;

/// Single shared SQLite connection exposed through [`Database`].
pub struct SqliteDatabase {
    conn: Connection,
}

impl SqliteDatabase {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Borrows the raw connection, e.g. for seeding fixtures.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl Database for SqliteDatabase {
    fn prepare<'a>(&'a self, sql: &str, args: &[Value]) -> DbResult<Box<dyn Statement + 'a>> {
        let inner = self.conn.prepare(sql)?;
        Ok(Box::new(SqliteStatement {
            inner,
            args: args.to_vec(),
            pending: None,
            current: None,
        }))
    }
}

struct SqliteStatement<'conn> {
    inner: rusqlite::Statement<'conn>,
    args: Vec<Value>,
    pending: Option<VecDeque<Vec<Value>>>,
    current: Option<Vec<Value>>,
}

impl SqliteStatement<'_> {
    fn read_rows(&mut self) -> DbResult<VecDeque<Vec<Value>>> {
        let column_count = self.inner.column_count();
        let mut rows = self.inner.query(params_from_iter(self.args.iter()))?;
        let mut buffered = VecDeque::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(column_count);
            for column in 0..column_count {
                values.push(row.get::<_, Value>(column)?);
            }
            buffered.push_back(values);
        }
        Ok(buffered)
    }
}

impl Statement for SqliteStatement<'_> {
    fn step(&mut self) -> DbResult<bool> {
        if self.pending.is_none() {
            let rows = self.read_rows()?;
            self.pending = Some(rows);
        }

        self.current = self.pending.as_mut().and_then(VecDeque::pop_front);
        Ok(self.current.is_some())
    }

    fn scan(&self) -> DbResult<ScannedRow> {
        self.current
            .as_ref()
            .map(|values| ScannedRow::new(values.clone()))
            .ok_or(DbError::NoCurrentRow)
    }

    fn exec(&mut self, args: &[Value]) -> DbResult<usize> {
        let changed = self.inner.execute(params_from_iter(args.iter()))?;
        Ok(changed)
    }
}
