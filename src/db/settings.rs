//! Key-value persistence for the ledger and preferences.

use rusqlite::{params, Connection};

use super::{try_lock, DbLockError, DbPool};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error(transparent)]
  Lock(#[from] DbLockError),
  #[error("settings query failed: {0}")]
  Sqlite(#[from] rusqlite::Error),
}

/// String key-value store used by the points ledger and preferences.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

// ==================== SQLite-backed store ====================

pub fn get_setting(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
  let mut stmt = conn.prepare("SELECT value FROM settings WHERE key = ?1")?;
  let mut rows = stmt.query(params![key])?;
  if let Some(row) = rows.next()? {
    Ok(Some(row.get(0)?))
  } else {
    Ok(None)
  }
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT OR REPLACE INTO settings (key, value) VALUES (?1, ?2)",
    params![key, value],
  )?;
  Ok(())
}

#[derive(Clone)]
pub struct SqliteStore {
  pool: DbPool,
}

impl SqliteStore {
  pub fn new(pool: DbPool) -> Self {
    Self { pool }
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = try_lock(&self.pool)?;
    Ok(get_setting(&conn, key)?)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = try_lock(&self.pool)?;
    Ok(set_setting(&conn, key, value)?)
  }
}
