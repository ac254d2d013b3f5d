//! Lines surrounding a search hit.
//!
//! A window is `[max(1, line - before), line + after]` within one logical
//! file. The upper bound is not clamped to the file length, so a window near
//! the end simply returns fewer rows. The `can_expand_*` flags tell a caller
//! whether widening the window in that direction could return more lines.

use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::models::LogicalFile;
use crate::search::parse_date;
use crate::store::SqliteStore;

pub const DEFAULT_LINES_BEFORE: u32 = 2;
pub const DEFAULT_LINES_AFTER: u32 = 2;

#[derive(Debug, Clone)]
pub struct ContextRequest {
    pub network: String,
    pub channel: String,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// 1-based line at the center of the window.
    pub line: i64,
    pub lines_before: u32,
    pub lines_after: u32,
}

impl ContextRequest {
    pub fn new(
        network: impl Into<String>,
        channel: impl Into<String>,
        date: impl Into<String>,
        line: i64,
    ) -> Self {
        Self {
            network: network.into(),
            channel: channel.into(),
            date: date.into(),
            line,
            lines_before: DEFAULT_LINES_BEFORE,
            lines_after: DEFAULT_LINES_AFTER,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextLine {
    pub line: i64,
    pub content: String,
    pub is_match: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContextWindow {
    pub entries: Vec<ContextLine>,
    pub start_line: i64,
    pub end_line: i64,
    pub total_lines: i64,
    pub can_expand_up: bool,
    pub can_expand_down: bool,
}

/// Window bounds for a center line. `end` is not clamped to the file
/// length, only to `i64::MAX`.
pub fn window_bounds(center: i64, before: u32, after: u32) -> (i64, i64) {
    let start = center.saturating_sub(i64::from(before)).max(1);
    let end = center.saturating_add(i64::from(after));
    (start, end)
}

pub async fn context(store: &SqliteStore, req: &ContextRequest) -> Result<ContextWindow> {
    if req.network.trim().is_empty() || req.channel.trim().is_empty() {
        return Err(ArchiveError::invalid("network and channel are required"));
    }
    if req.line < 1 {
        return Err(ArchiveError::invalid(format!(
            "line must be >= 1, got {}",
            req.line
        )));
    }
    let date = parse_date(req.date.trim())
        .ok_or_else(|| ArchiveError::invalid(format!("date must be YYYY-MM-DD, got '{}'", req.date)))?;

    let file = LogicalFile {
        network_id: &req.network,
        channel: &req.channel,
        date,
    };
    let (start_line, end_line) = window_bounds(req.line, req.lines_before, req.lines_after);

    let entries = store
        .window(&file, start_line, end_line)
        .await?
        .into_iter()
        .map(|(line, content)| ContextLine {
            is_match: line == req.line,
            line,
            content,
        })
        .collect();

    let total_lines = store.count_entries(&file).await?;

    Ok(ContextWindow {
        entries,
        start_line,
        end_line,
        total_lines,
        can_expand_up: start_line > 1,
        can_expand_down: end_line < total_lines,
    })
}

/// CLI entry point: print the window with the center line marked.
pub fn print_window(req: &ContextRequest, window: &ContextWindow) {
    println!(
        "--- {} {} {} (lines {}-{} of {}) ---",
        req.network, req.channel, req.date, window.start_line, window.end_line, window.total_lines
    );
    if window.entries.is_empty() {
        println!("(no lines)");
    }
    for entry in &window.entries {
        let marker = if entry.is_match { '>' } else { ' ' };
        println!("{} {:>6}  {}", marker, entry.line, entry.content);
    }
    if window.can_expand_up {
        println!("  ... more above");
    }
    if window.can_expand_down {
        println!("  ... more below");
    }
}
