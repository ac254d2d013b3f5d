//! SQLite database connection management.
//!
//! Provides a connection pool to the archive database with WAL mode
//! enabled, so searches keep reading committed data while an import
//! transaction is open. The database file and its parent directories are
//! created automatically if they don't exist.
//!
//! # Encryption
//!
//! When a credential is configured it is sent as `PRAGMA key` before any
//! other statement on every connection. An SQLCipher-linked SQLite uses it
//! to unlock the file; a stock SQLite ignores the unknown pragma. Key
//! management itself lives outside this crate.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;

use crate::error::Result;

/// Create a connection pool to the archive database at `db_path`.
///
/// - Creates the database file and parent directories if they don't exist.
/// - Applies `key` as the first pragma when present.
/// - Enables WAL journal mode for concurrent read/write.
/// - Returns a pool with up to 5 connections.
pub async fn connect(db_path: &Path, key: Option<&str>) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    // sqlx emits the key pragma ahead of every other pragma
    if let Some(key) = key {
        options = options.pragma("key", quote_key(key));
    }

    let options = options
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

/// Quote a credential as an SQL string literal.
fn quote_key(key: &str) -> String {
    format!("'{}'", key.replace('\'', "''"))
}
