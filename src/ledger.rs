//! Import ledger: when the last import run happened.
//!
//! A single `import_metadata` row keyed `last_import_date` holds the
//! wall-clock start time of the most recent run (full or incremental). The
//! next incremental run skips files dated before that day.
//!
//! The stamp is the run time, not the newest log date seen. Logs for older
//! days that appear in the source after a run are therefore never picked up
//! by an incremental run; a full import is the way to back-fill them.

use chrono::{DateTime, NaiveDateTime};
use sqlx::SqlitePool;

use crate::error::Result;

pub const LAST_IMPORT_KEY: &str = "last_import_date";

const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Timestamp of the last import run, if one was recorded and is readable.
pub async fn get_last_import(pool: &SqlitePool) -> Result<Option<NaiveDateTime>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM import_metadata WHERE key = ?")
            .bind(LAST_IMPORT_KEY)
            .fetch_optional(pool)
            .await?;

    let Some(raw) = value.flatten() else {
        return Ok(None);
    };

    let parsed = parse_stamp(&raw);
    if parsed.is_none() {
        tracing::warn!(value = %raw, "Ignoring unreadable last_import_date");
    }
    Ok(parsed)
}

/// Record `at` as the time of the last import run.
pub async fn set_last_import(pool: &SqlitePool, at: NaiveDateTime) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO import_metadata (key, value) VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        "#,
    )
    .bind(LAST_IMPORT_KEY)
    .bind(format_stamp(at))
    .execute(pool)
    .await?;

    Ok(())
}

pub fn format_stamp(at: NaiveDateTime) -> String {
    at.format(STAMP_FORMAT).to_string()
}

/// Accepts the local ISO stamps this module writes, plus RFC 3339 stamps
/// carrying an offset (the offset is dropped).
fn parse_stamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, STAMP_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, migrate};
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 12, 4)
            .unwrap()
            .and_hms_micro_opt(h, 30, 0, 123_456)
            .unwrap()
    }

    #[test]
    fn stamp_formats() {
        assert_eq!(format_stamp(at(9)), "2025-12-04T09:30:00.123456");
        assert_eq!(parse_stamp("2025-12-04T09:30:00.123456"), Some(at(9)));
        assert_eq!(
            parse_stamp("2025-12-04T09:30:00"),
            NaiveDate::from_ymd_opt(2025, 12, 4).unwrap().and_hms_opt(9, 30, 0)
        );
        assert!(parse_stamp("2025-12-04T09:30:00+02:00").is_some());
        assert_eq!(parse_stamp("yesterday"), None);
    }

    #[tokio::test]
    async fn roundtrip_and_overwrite() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("l.db"), None).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();

        assert_eq!(get_last_import(&pool).await.unwrap(), None);
        set_last_import(&pool, at(9)).await.unwrap();
        set_last_import(&pool, at(11)).await.unwrap();
        assert_eq!(get_last_import(&pool).await.unwrap(), Some(at(11)));

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM import_metadata")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(rows, 1);
        pool.close().await;
    }

    #[tokio::test]
    async fn garbage_value_reads_as_none() {
        let tmp = tempfile::TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("l.db"), None).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        sqlx::query("INSERT INTO import_metadata (key, value) VALUES (?, 'not a date')")
            .bind(LAST_IMPORT_KEY)
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(get_last_import(&pool).await.unwrap(), None);
        pool.close().await;
    }
}
