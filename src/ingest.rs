//! Import pipeline orchestration.
//!
//! Walks the log source network by network, channel by channel, file by
//! file (oldest first) and writes each dated file as one logical file:
//!
//! ```text
//! LogSource ─▶ parse_log_date ─▶ skip rules ─▶ decode + number lines ─▶ SqliteStore
//! ```
//!
//! **Full** runs replace every logical file with the current file content.
//! **Incremental** runs only fill in logical files that have no entries yet
//! and are dated on or after the day of the previous run; they never delete.
//!
//! Only configuration problems and the ledger read/write abort a run.
//! Anything that goes wrong with a single file, channel or network is
//! recorded in the [`ImportReport`] and the run moves on.

use chrono::{Local, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::dates::parse_log_date;
use crate::error::{ConfigurationError, Result};
use crate::ledger;
use crate::models::{
    ChannelFailure, FileFailure, FileOutcome, FileReport, ImportMode, ImportReport, LogicalFile, Network,
    NetworkReport, NewEntry, SkipReason,
};
use crate::source::{LogFile, LogSource};
use crate::store::SqliteStore;

/// One import run over a log source.
pub struct ImportPipeline<'a, S: LogSource> {
    source: &'a S,
    store: &'a SqliteStore,
    display_names: &'a BTreeMap<String, String>,
}

impl<'a, S: LogSource> ImportPipeline<'a, S> {
    pub fn new(
        source: &'a S,
        store: &'a SqliteStore,
        display_names: &'a BTreeMap<String, String>,
    ) -> Self {
        Self {
            source,
            store,
            display_names,
        }
    }

    /// Run an import and stamp the ledger with the run's start time.
    pub async fn run(&self, mode: ImportMode, network_filter: Option<&str>) -> Result<ImportReport> {
        let started_at = Local::now().naive_local();
        self.run_at(mode, network_filter, started_at).await
    }

    /// [`run`](Self::run) with an explicit wall-clock stamp.
    pub async fn run_at(
        &self,
        mode: ImportMode,
        network_filter: Option<&str>,
        started_at: NaiveDateTime,
    ) -> Result<ImportReport> {
        let networks = self.select_networks(network_filter)?;

        let cutoff = match mode {
            ImportMode::Full => None,
            ImportMode::Incremental => ledger::get_last_import(self.store.pool()).await?,
        };
        match (mode, cutoff) {
            (ImportMode::Incremental, Some(c)) => {
                info!(cutoff = %c.date(), "Incremental import: only importing logs dated on or after cutoff")
            }
            (ImportMode::Incremental, None) => {
                info!("Incremental import: no previous import recorded, importing all unseen files")
            }
            (ImportMode::Full, _) => info!("Full import: replacing every logical file"),
        }

        let mut report = ImportReport {
            mode,
            cutoff,
            started_at,
            lines_imported: 0,
            networks: Vec::with_capacity(networks.len()),
        };

        for network_id in &networks {
            let net = self
                .import_network(network_id, mode, cutoff.map(|c| c.date()))
                .await;
            info!(
                network = %net.network_id,
                lines = net.lines_imported,
                "Network imported"
            );
            report.lines_imported += net.lines_imported;
            report.networks.push(net);
        }

        ledger::set_last_import(self.store.pool(), started_at).await?;

        Ok(report)
    }

    fn select_networks(&self, network_filter: Option<&str>) -> Result<Vec<String>> {
        if !self.source.root_exists() {
            return Err(ConfigurationError::SourceRootMissing(self.root_path()).into());
        }

        match network_filter {
            Some(network) => {
                if !self.source.has_network(network) {
                    return Err(ConfigurationError::NetworkNotFound {
                        network: network.to_string(),
                        root: self.root_path(),
                    }
                    .into());
                }
                Ok(vec![network.to_string()])
            }
            None => Ok(self.source.networks()?),
        }
    }

    fn root_path(&self) -> std::path::PathBuf {
        self.source.root().to_path_buf()
    }

    async fn import_network(
        &self,
        network_id: &str,
        mode: ImportMode,
        cutoff: Option<NaiveDate>,
    ) -> NetworkReport {
        let network = Network {
            id: network_id.to_string(),
            display_name: display_name(network_id, self.display_names),
        };

        let mut report = NetworkReport {
            network_id: network.id.clone(),
            display_name: network.display_name.clone(),
            lines_imported: 0,
            log_dir_missing: false,
            failure: None,
            channels: 0,
            failed_channels: Vec::new(),
            files: Vec::new(),
        };

        if let Err(e) = self.store.upsert_network(&network).await {
            warn!(network = %network_id, error = %e, "Cannot record network, skipping it");
            report.failure = Some(FileFailure::StoreWrite(e.to_string()));
            return report;
        }

        let channels = match self.source.channels(network_id) {
            Ok(Some(channels)) => channels,
            Ok(None) => {
                warn!(network = %network_id, "Log directory not found, skipping network");
                report.log_dir_missing = true;
                return report;
            }
            Err(e) => {
                warn!(network = %network_id, error = %e, "Cannot list log directory, skipping network");
                report.failure = Some(FileFailure::Io(e.to_string()));
                return report;
            }
        };
        report.channels = channels.len();

        for channel in &channels {
            debug!(network = %network_id, channel = %channel, "Processing channel");

            let files = match self.source.log_files(network_id, channel) {
                Ok(files) => files,
                Err(e) => {
                    warn!(network = %network_id, channel = %channel, error = %e, "Cannot list channel directory");
                    report.failed_channels.push(ChannelFailure {
                        channel: channel.clone(),
                        error: FileFailure::Io(e.to_string()),
                    });
                    continue;
                }
            };

            if let Err(e) = self.store.upsert_channel(network_id, channel).await {
                warn!(network = %network_id, channel = %channel, error = %e, "Cannot record channel");
                report.failed_channels.push(ChannelFailure {
                    channel: channel.clone(),
                    error: FileFailure::StoreWrite(e.to_string()),
                });
                continue;
            }

            for file in &files {
                let (date, outcome) = self.import_file(network_id, channel, file, mode, cutoff).await;
                if let FileOutcome::Imported { lines } = outcome {
                    report.lines_imported += lines;
                }
                report.files.push(FileReport {
                    channel: channel.clone(),
                    file_name: file.file_name.clone(),
                    date,
                    outcome,
                });
            }
        }

        report
    }

    async fn import_file(
        &self,
        network_id: &str,
        channel: &str,
        file: &LogFile,
        mode: ImportMode,
        cutoff: Option<NaiveDate>,
    ) -> (Option<NaiveDate>, FileOutcome) {
        let Some(date) = parse_log_date(&file.file_name) else {
            warn!(channel = %channel, file = %file.file_name, "Skipping file with unparseable date");
            return (None, skipped(SkipReason::UnparseableDate));
        };

        let logical = LogicalFile {
            network_id,
            channel,
            date,
        };

        if mode == ImportMode::Incremental {
            if cutoff.is_some_and(|c| date < c) {
                return (Some(date), skipped(SkipReason::BeforeCutoff));
            }
            match self.store.count_entries(&logical).await {
                Ok(n) if n > 0 => return (Some(date), skipped(SkipReason::AlreadyImported)),
                Ok(_) => {}
                Err(e) => return (Some(date), failed(file, FileFailure::StoreWrite(e.to_string()))),
            }
        }

        let bytes = match self.source.read(file) {
            Ok(bytes) => bytes,
            Err(e) => return (Some(date), failed(file, FileFailure::Io(e.to_string()))),
        };
        let entries = split_lines(&bytes);

        let written = match mode {
            ImportMode::Full => self.store.replace_file(&logical, &entries).await.map(Some),
            ImportMode::Incremental => self.store.fill_file(&logical, &entries).await,
        };

        match written {
            Ok(Some(lines)) => {
                debug!(channel = %channel, file = %file.file_name, lines, "Imported");
                (Some(date), FileOutcome::Imported { lines })
            }
            // lost a race with another writer between the pre-check and the transaction
            Ok(None) => (Some(date), skipped(SkipReason::AlreadyImported)),
            Err(e) => (Some(date), failed(file, FileFailure::StoreWrite(e.to_string()))),
        }
    }
}

fn skipped(reason: SkipReason) -> FileOutcome {
    FileOutcome::Skipped { reason }
}

fn failed(file: &LogFile, error: FileFailure) -> FileOutcome {
    warn!(file = %file.path.display(), error = ?error, "Failed to import file");
    FileOutcome::Failed { error }
}

/// Display name for a network folder: the configured mapping, else the
/// folder name with its first character upper-cased and the rest lower-cased.
pub fn display_name(network_id: &str, names: &BTreeMap<String, String>) -> String {
    if let Some(name) = names.get(network_id) {
        return name.clone();
    }
    let mut chars = network_id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Decode a log file best-effort and number its lines from 1.
///
/// Invalid UTF-8 becomes U+FFFD. Lines end at `\n`, `\r\n` or a lone `\r`;
/// trailing whitespace is dropped, leading whitespace is kept.
pub fn split_lines(bytes: &[u8]) -> Vec<NewEntry> {
    let text = String::from_utf8_lossy(bytes);
    let mut entries = Vec::new();
    let mut rest: &str = &text;

    while !rest.is_empty() {
        let (line, tail) = match rest.find(['\n', '\r']) {
            Some(pos) => {
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                (&rest[..pos], &rest[pos + skip..])
            }
            None => (rest, ""),
        };
        entries.push(NewEntry {
            line_number: entries.len() as i64 + 1,
            content: line.trim_end().to_string(),
        });
        rest = tail;
    }

    entries
}
