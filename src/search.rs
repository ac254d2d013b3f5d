//! Substring search over stored log lines.
//!
//! Matching is plain containment: no tokenizing, no ranking, no wildcards.
//! Case-insensitive search lower-cases both the query and each line
//! (Unicode-aware) before comparing.
//!
//! Results come back newest day first, then in line order within a day,
//! and are capped at [`MAX_RESULTS`]. Hitting the cap sets `truncated`;
//! there is no paging beyond it.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{ArchiveError, Result};
use crate::models::DATE_FORMAT;
use crate::store::{EntryHit, ScanScope, SqliteStore};

/// Hard cap on rows returned by one search.
pub const MAX_RESULTS: usize = 1000;

/// Inputs for a single search invocation.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    /// Text to look for. Required.
    pub query: String,
    /// Network folder name. Required.
    pub network: String,
    /// Restrict to one channel.
    pub channel: Option<String>,
    /// Inclusive lower bound, `YYYY-MM-DD`.
    pub start_date: Option<String>,
    /// Inclusive upper bound, `YYYY-MM-DD`.
    pub end_date: Option<String>,
    pub case_sensitive: bool,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            network: network.into(),
            ..Default::default()
        }
    }
}

/// A matching log line.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Network display name.
    pub network: String,
    pub network_id: String,
    pub channel: String,
    pub date: String,
    pub line: i64,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    pub total: usize,
    pub truncated: bool,
}

/// Decides whether a line contains the query.
#[derive(Debug, Clone)]
pub struct Matcher {
    needle: String,
    case_sensitive: bool,
}

impl Matcher {
    pub fn new(query: &str, case_sensitive: bool) -> Self {
        let needle = if case_sensitive {
            query.to_string()
        } else {
            query.to_lowercase()
        };
        Self {
            needle,
            case_sensitive,
        }
    }

    pub fn is_match(&self, content: &str) -> bool {
        if self.case_sensitive {
            content.contains(&self.needle)
        } else {
            content.to_lowercase().contains(&self.needle)
        }
    }
}

/// Run a search against the store.
///
/// Missing `query`/`network` and malformed dates are rejected before any
/// row is read.
pub async fn search(store: &SqliteStore, req: &SearchRequest) -> Result<SearchResponse> {
    let scope = validate(req)?;
    let matcher = Matcher::new(&req.query, req.case_sensitive);

    let hits = store
        .scan_entries(&scope, MAX_RESULTS, |content| matcher.is_match(content))
        .await?;

    Ok(into_response(hits))
}

fn validate(req: &SearchRequest) -> Result<ScanScope<'_>> {
    if req.query.is_empty() {
        return Err(ArchiveError::invalid("query is required"));
    }
    if req.network.trim().is_empty() {
        return Err(ArchiveError::invalid("network is required"));
    }

    let channel = req.channel.as_deref().filter(|c| !c.is_empty());
    let start_date = parse_bound("start_date", req.start_date.as_deref())?;
    let end_date = parse_bound("end_date", req.end_date.as_deref())?;

    Ok(ScanScope {
        network_id: &req.network,
        channel,
        start_date: start_date.map(|d| d.format(DATE_FORMAT).to_string()),
        end_date: end_date.map(|d| d.format(DATE_FORMAT).to_string()),
    })
}

/// Empty strings count as "no bound".
fn parse_bound(field: &str, value: Option<&str>) -> Result<Option<NaiveDate>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(None),
        Some(v) => parse_date(v)
            .map(Some)
            .ok_or_else(|| ArchiveError::invalid(format!("{} must be YYYY-MM-DD, got '{}'", field, v))),
    }
}

/// Parse a `YYYY-MM-DD` date as given by callers.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

fn into_response(hits: Vec<EntryHit>) -> SearchResponse {
    let results: Vec<SearchResult> = hits
        .into_iter()
        .map(|h| SearchResult {
            network: h.display_name,
            network_id: h.network_id,
            channel: h.channel,
            date: h.date,
            line: h.line,
            content: h.content,
        })
        .collect();

    SearchResponse {
        total: results.len(),
        truncated: results.len() >= MAX_RESULTS,
        results,
    }
}

/// CLI entry point: print results to stdout.
pub fn print_results(resp: &SearchResponse) {
    if resp.results.is_empty() {
        println!("No results.");
        return;
    }

    for r in &resp.results {
        println!("{} {} {}:{}  {}", r.network, r.channel, r.date, r.line, r.content);
    }
    println!();
    if resp.truncated {
        println!("{} results (truncated at {})", resp.total, MAX_RESULTS);
    } else {
        println!("{} results", resp.total);
    }
}
