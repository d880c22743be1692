//! Idempotent table bootstrap for people and their associated collections.
//!
//! # Invariants
//! - Bootstrapping never alters or drops existing tables or rows.
//! - Junction tables are not linked to `people` by foreign keys.

use rusqlite::Connection;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Tables every repository expects to find.
pub const REQUIRED_TABLES: [&str; 5] = [
    "people",
    "vehicles",
    "starships",
    "people_vehicles",
    "people_starships",
];

/// Creates any missing table. Existing data is left untouched.
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Returns whether `table` exists in the connected database.
pub fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
