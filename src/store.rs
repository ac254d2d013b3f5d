//! SQLite-backed log store.
//!
//! Wraps a [`SqlitePool`] and owns every SQL statement the importer and the
//! query engine run. Writes that touch a logical file's entries go through
//! one transaction each, so readers see either the previous version of the
//! file or the new one, never a mix.

use futures::TryStreamExt;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::error::Result;
use crate::models::{LogicalFile, Network, NewEntry};

/// Restricts a search scan to part of one network.
#[derive(Debug, Clone)]
pub struct ScanScope<'a> {
    pub network_id: &'a str,
    pub channel: Option<&'a str>,
    /// Inclusive `YYYY-MM-DD` bounds.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// One matching log line as returned by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryHit {
    pub network_id: String,
    pub display_name: String,
    pub channel: String,
    pub date: String,
    pub line: i64,
    pub content: String,
}

/// Per-network row of [`StoreTotals`].
#[derive(Debug, Clone)]
pub struct NetworkCount {
    pub network_id: String,
    pub display_name: String,
    pub entries: i64,
}

/// Aggregates over the whole `log_entries` table.
#[derive(Debug, Clone)]
pub struct StoreTotals {
    pub entries: i64,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub networks: i64,
    pub channels: i64,
    pub per_network: Vec<NetworkCount>,
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // ============ Import writes ============

    pub async fn upsert_network(&self, network: &Network) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO networks (id, display_name) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET display_name = excluded.display_name
            "#,
        )
        .bind(&network.id)
        .bind(&network.display_name)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn upsert_channel(&self, network_id: &str, name: &str) -> Result<()> {
        sqlx::query("INSERT OR IGNORE INTO channels (network_id, name) VALUES (?, ?)")
            .bind(network_id)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn count_entries(&self, file: &LogicalFile<'_>) -> Result<i64> {
        let mut conn = self.pool.acquire().await?;
        count_in(&mut conn, file).await
    }

    /// Replace a logical file's entries with `entries`, atomically.
    ///
    /// Returns the number of lines written.
    pub async fn replace_file(&self, file: &LogicalFile<'_>, entries: &[NewEntry]) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        delete_in(&mut tx, file).await?;
        let written = insert_in(&mut tx, file, entries).await?;

        tx.commit().await?;
        Ok(written)
    }

    /// Insert a logical file's entries only if none are stored yet.
    ///
    /// Returns `None` (and writes nothing) when the file already has entries.
    pub async fn fill_file(
        &self,
        file: &LogicalFile<'_>,
        entries: &[NewEntry],
    ) -> Result<Option<u64>> {
        let mut tx: Transaction<'_, Sqlite> = self.pool.begin().await?;

        if count_in(&mut tx, file).await? > 0 {
            tx.rollback().await?;
            return Ok(None);
        }
        let written = insert_in(&mut tx, file, entries).await?;

        tx.commit().await?;
        Ok(Some(written))
    }

    // ============ Query reads ============

    /// Stream entries in `scope` ordered by date (newest first), then line,
    /// with channel name as the last key, keeping those whose content
    /// satisfies `matches`.
    ///
    /// Stops reading as soon as `limit` hits are collected.
    pub async fn scan_entries<F>(
        &self,
        scope: &ScanScope<'_>,
        limit: usize,
        matches: F,
    ) -> Result<Vec<EntryHit>>
    where
        F: Fn(&str) -> bool,
    {
        let mut sql = String::from(
            r#"
            SELECT le.network_id, COALESCE(n.display_name, le.network_id) AS display_name,
                   le.channel_name, le.log_date, le.line_number, le.content
            FROM log_entries le
            LEFT JOIN networks n ON n.id = le.network_id
            WHERE le.network_id = ?
            "#,
        );
        let mut binds: Vec<&str> = vec![scope.network_id];

        if let Some(channel) = scope.channel {
            sql.push_str(" AND le.channel_name = ?");
            binds.push(channel);
        }
        if let Some(ref start) = scope.start_date {
            sql.push_str(" AND le.log_date >= ?");
            binds.push(start);
        }
        if let Some(ref end) = scope.end_date {
            sql.push_str(" AND le.log_date <= ?");
            binds.push(end);
        }
        sql.push_str(" ORDER BY le.log_date DESC, le.line_number ASC, le.channel_name ASC");

        let mut query = sqlx::query(&sql);
        for value in binds {
            query = query.bind(value);
        }

        let mut hits = Vec::new();
        if limit == 0 {
            return Ok(hits);
        }

        let mut rows = query.fetch(&self.pool);
        while let Some(row) = rows.try_next().await? {
            let content: String = row.get("content");
            if !matches(&content) {
                continue;
            }
            hits.push(EntryHit {
                network_id: row.get("network_id"),
                display_name: row.get("display_name"),
                channel: row.get("channel_name"),
                date: row.get("log_date"),
                line: row.get("line_number"),
                content,
            });
            if hits.len() >= limit {
                break;
            }
        }

        Ok(hits)
    }

    /// Lines `start..=end` of a logical file, in line order.
    pub async fn window(
        &self,
        file: &LogicalFile<'_>,
        start: i64,
        end: i64,
    ) -> Result<Vec<(i64, String)>> {
        let rows = sqlx::query(
            r#"
            SELECT line_number, content
            FROM log_entries
            WHERE network_id = ? AND channel_name = ? AND log_date = ?
              AND line_number BETWEEN ? AND ?
            ORDER BY line_number
            "#,
        )
        .bind(file.network_id)
        .bind(file.channel)
        .bind(file.date_key())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.get("line_number"), row.get("content")))
            .collect())
    }

    pub async fn totals(&self) -> Result<StoreTotals> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS entries,
                   MIN(log_date) AS first_date,
                   MAX(log_date) AS last_date,
                   COUNT(DISTINCT network_id) AS networks,
                   COUNT(DISTINCT network_id || '/' || channel_name) AS channels
            FROM log_entries
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let per_network = sqlx::query(
            r#"
            SELECT le.network_id, COALESCE(n.display_name, le.network_id) AS display_name,
                   COUNT(*) AS entries
            FROM log_entries le
            LEFT JOIN networks n ON n.id = le.network_id
            GROUP BY le.network_id
            ORDER BY entries DESC, le.network_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?
        .iter()
        .map(|r| NetworkCount {
            network_id: r.get("network_id"),
            display_name: r.get("display_name"),
            entries: r.get("entries"),
        })
        .collect();

        Ok(StoreTotals {
            entries: row.get("entries"),
            first_date: row.get("first_date"),
            last_date: row.get("last_date"),
            networks: row.get("networks"),
            channels: row.get("channels"),
            per_network,
        })
    }

    pub async fn networks(&self) -> Result<Vec<Network>> {
        let rows = sqlx::query("SELECT id, display_name FROM networks ORDER BY display_name, id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|r| Network {
                id: r.get("id"),
                display_name: r.get("display_name"),
            })
            .collect())
    }

    /// Channels that have at least one stored line for `network_id`.
    pub async fn channels(&self, network_id: &str) -> Result<Vec<String>> {
        let names = sqlx::query_scalar(
            "SELECT DISTINCT channel_name FROM log_entries WHERE network_id = ? ORDER BY channel_name",
        )
        .bind(network_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(names)
    }
}

// Statement helpers shared by the pooled and transactional paths.

async fn count_in(conn: &mut SqliteConnection, file: &LogicalFile<'_>) -> Result<i64> {
    let count = sqlx::query_scalar(
        "SELECT COUNT(*) FROM log_entries WHERE network_id = ? AND channel_name = ? AND log_date = ?",
    )
    .bind(file.network_id)
    .bind(file.channel)
    .bind(file.date_key())
    .fetch_one(&mut *conn)
    .await?;

    Ok(count)
}

async fn delete_in(conn: &mut SqliteConnection, file: &LogicalFile<'_>) -> Result<u64> {
    let done = sqlx::query(
        "DELETE FROM log_entries WHERE network_id = ? AND channel_name = ? AND log_date = ?",
    )
    .bind(file.network_id)
    .bind(file.channel)
    .bind(file.date_key())
    .execute(&mut *conn)
    .await?;

    Ok(done.rows_affected())
}

async fn insert_in(
    conn: &mut SqliteConnection,
    file: &LogicalFile<'_>,
    entries: &[NewEntry],
) -> Result<u64> {
    let date = file.date_key();
    for entry in entries {
        sqlx::query(
            r#"
            INSERT INTO log_entries (network_id, channel_name, log_date, line_number, content)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(file.network_id)
        .bind(file.channel)
        .bind(&date)
        .bind(entry.line_number)
        .bind(&entry.content)
        .execute(&mut *conn)
        .await?;
    }

    Ok(entries.len() as u64)
}
