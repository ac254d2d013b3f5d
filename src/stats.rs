//! Archive statistics.
//!
//! A quick summary of what's stored: line counts, the covered date range and
//! a per-network breakdown. Used by `zlog stats` and printed at the end of
//! every import run.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::Path;

use crate::error::Result;
use crate::ledger;
use crate::store::SqliteStore;

#[derive(Debug, Clone, Serialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkStats {
    pub network_id: String,
    /// Display name.
    pub network: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveStats {
    pub total_entries: i64,
    pub date_range: DateRange,
    /// Ordered by `count` descending.
    pub networks: Vec<NetworkStats>,
    pub network_count: i64,
    pub channel_count: i64,
    pub last_import: Option<NaiveDateTime>,
}

pub async fn collect_stats(store: &SqliteStore) -> Result<ArchiveStats> {
    let totals = store.totals().await?;
    let last_import = ledger::get_last_import(store.pool()).await?;

    Ok(ArchiveStats {
        total_entries: totals.entries,
        date_range: DateRange {
            start: totals.first_date,
            end: totals.last_date,
        },
        networks: totals
            .per_network
            .into_iter()
            .map(|n| NetworkStats {
                network_id: n.network_id,
                network: n.display_name,
                count: n.entries,
            })
            .collect(),
        network_count: totals.networks,
        channel_count: totals.channels,
        last_import,
    })
}

/// CLI entry point: print a human-readable summary.
pub fn print_stats(stats: &ArchiveStats, db_path: &Path) {
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("ZNC Log Vault: Archive Stats");
    println!("=============================");
    println!();
    println!("  Database:    {}", db_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!(
        "  Last import: {}",
        stats
            .last_import
            .map(format_relative)
            .unwrap_or_else(|| "never".to_string())
    );
    println!();
    println!("  Lines:       {}", format_number(stats.total_entries));
    println!("  Networks:    {}", stats.network_count);
    println!("  Channels:    {}", stats.channel_count);
    println!(
        "  Date range:  {} to {}",
        stats.date_range.start.as_deref().unwrap_or("-"),
        stats.date_range.end.as_deref().unwrap_or("-")
    );

    if !stats.networks.is_empty() {
        println!();
        println!("  By network:");
        println!("  {:<24} {:<24} {:>12}", "NETWORK", "ID", "LINES");
        println!("  {}", "-".repeat(62));
        for n in &stats.networks {
            println!(
                "  {:<24} {:<24} {:>12}",
                n.network,
                n.network_id,
                format_number(n.count)
            );
        }
    }

    println!();
}

/// Format a count with thousands separators.
pub fn format_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    if n < 0 {
        out.insert(0, '-');
    }
    out
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a local timestamp relative to now (e.g. "3 hours ago").
fn format_relative(at: NaiveDateTime) -> String {
    let delta = (Local::now().naive_local() - at).num_seconds();

    if delta < 0 {
        return at.format("%Y-%m-%d %H:%M").to_string();
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        at.format("%Y-%m-%d %H:%M").to_string()
    }
}
