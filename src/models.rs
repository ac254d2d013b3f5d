//! Core data models used throughout the archive.
//!
//! These types represent the networks, channels and log lines stored in
//! SQLite, and the reports that flow out of an import run.

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// An IRC network, keyed by its folder name under the ZNC base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub id: String,
    pub display_name: String,
}

/// One line of one logical file, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub line_number: i64,
    pub content: String,
}

/// Identifies a logical file: every line logged in one channel on one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalFile<'a> {
    pub network_id: &'a str,
    pub channel: &'a str,
    pub date: NaiveDate,
}

impl LogicalFile<'_> {
    /// Date in the `YYYY-MM-DD` form stored in the `log_date` column.
    pub fn date_key(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }
}

/// Storage and wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// How an import run treats logical files that are already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Replace every logical file with its current on-disk content.
    Full,
    /// Only add logical files that are absent, dated on or after the cutoff.
    Incremental,
}

/// Why a file was passed over without touching the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Filename matches neither `YYYY-MM-DD.log` nor `*_YYYYMMDD.log`.
    UnparseableDate,
    /// Dated strictly before the incremental cutoff.
    BeforeCutoff,
    /// Entries for this logical file already exist (incremental only).
    AlreadyImported,
}

/// A failure scoped to one file, channel or network. Whatever was stored
/// for it before the run is left as it was.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FileFailure {
    Io(String),
    StoreWrite(String),
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileFailure::Io(msg) => write!(f, "read error: {}", msg),
            FileFailure::StoreWrite(msg) => write!(f, "write error: {}", msg),
        }
    }
}

/// A channel directory that could not be listed or recorded. None of its
/// files were looked at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelFailure {
    pub channel: String,
    pub error: FileFailure,
}

/// Result of processing one log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Imported { lines: u64 },
    Skipped { reason: SkipReason },
    Failed { error: FileFailure },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub channel: String,
    pub file_name: String,
    pub date: Option<NaiveDate>,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct NetworkReport {
    pub network_id: String,
    pub display_name: String,
    pub lines_imported: u64,
    /// `moddata/log` was absent; nothing under this network was read.
    pub log_dir_missing: bool,
    /// The network could not be recorded or its log directory listed.
    pub failure: Option<FileFailure>,
    pub channels: usize,
    pub failed_channels: Vec<ChannelFailure>,
    pub files: Vec<FileReport>,
}

impl NetworkReport {
    pub fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Structured summary of an import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub mode: ImportMode,
    /// Cutoff applied to incremental runs (`None` for full runs or first run).
    pub cutoff: Option<NaiveDateTime>,
    pub started_at: NaiveDateTime,
    pub lines_imported: u64,
    pub networks: Vec<NetworkReport>,
}

impl ImportReport {
    pub fn files_imported(&self) -> usize {
        self.networks
            .iter()
            .map(|n| n.count(|o| matches!(o, FileOutcome::Imported { .. })))
            .sum()
    }

    pub fn files_skipped(&self) -> usize {
        self.networks
            .iter()
            .map(|n| n.count(|o| matches!(o, FileOutcome::Skipped { .. })))
            .sum()
    }

    /// Every file that failed, across all networks.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &FileReport)> {
        self.networks.iter().flat_map(|n| {
            n.files
                .iter()
                .filter(|f| matches!(f.outcome, FileOutcome::Failed { .. }))
                .map(move |f| (n.network_id.as_str(), f))
        })
    }

    /// Lines imported for one network, if it was part of the run.
    pub fn lines_for(&self, network_id: &str) -> Option<u64> {
        self.networks
            .iter()
            .find(|n| n.network_id == network_id)
            .map(|n| n.lines_imported)
    }
}
