//! SQLite persistence for observed principal values.

use rusqlite::{Connection, params};
use std::path::Path;
use thiserror::Error;

use crate::config::HistoryEntry;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct HistoryStore {
    conn: Connection,
}

impl HistoryStore {
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self { conn })
    }

    /// Inserts entries, replacing the principal of any date already stored.
    pub fn insert_entries(&mut self, entries: &[HistoryEntry]) -> Result<usize> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO principal_stock_history (date, principal_stock) VALUES (?1, ?2)
                 ON CONFLICT(date) DO UPDATE SET principal_stock = excluded.principal_stock",
            )?;
            for entry in entries {
                stmt.execute(params![entry.date, entry.principal_stock])?;
            }
        }
        tx.commit()?;
        Ok(entries.len())
    }

    /// Stored entries in first-insertion order.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT date, principal_stock FROM principal_stock_history ORDER BY rowid")?;
        let rows = stmt.query_map([], |row| {
            Ok(HistoryEntry {
                date: row.get(0)?,
                principal_stock: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

fn init(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS principal_stock_history (
          date TEXT PRIMARY KEY,
          principal_stock REAL NOT NULL
        );
        "#,
    )
}
