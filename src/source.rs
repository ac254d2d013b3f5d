//! Log source: the ZNC directory tree the importer reads from.
//!
//! ```text
//! <base>/<network>/moddata/log/<channel>/<YYYY-MM-DD>.log
//!                                       /<anything>_<YYYYMMDD>.log
//! ```
//!
//! The [`LogSource`] trait is the seam the import pipeline reads through;
//! [`ZncLogTree`] implements it over the real filesystem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::dates::LOG_EXTENSION;

/// A log file discovered in a channel directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFile {
    pub file_name: String,
    pub path: PathBuf,
}

/// Read access to a base → network → channel → dated file hierarchy.
///
/// All listings are sorted ascending by name so imports are deterministic
/// and dated files come out in chronological order.
pub trait LogSource {
    /// The base directory, for diagnostics.
    fn root(&self) -> &Path;

    /// Whether the base directory exists at all.
    fn root_exists(&self) -> bool;

    /// Whether `network` exists directly under the base directory.
    fn has_network(&self, network: &str) -> bool;

    /// All network directories under the base directory.
    fn networks(&self) -> io::Result<Vec<String>>;

    /// Channel directories for a network, or `None` when the network has no
    /// log directory.
    fn channels(&self, network: &str) -> io::Result<Option<Vec<String>>>;

    /// `.log` files in a channel directory.
    fn log_files(&self, network: &str, channel: &str) -> io::Result<Vec<LogFile>>;

    /// Raw bytes of one log file.
    fn read(&self, file: &LogFile) -> io::Result<Vec<u8>>;
}

/// Filesystem-backed [`LogSource`] for a ZNC `networks` directory.
#[derive(Debug, Clone)]
pub struct ZncLogTree {
    root: PathBuf,
}

impl ZncLogTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn log_dir(&self, network: &str) -> PathBuf {
        self.root.join(network).join("moddata").join("log")
    }
}

/// Names of the immediate children of `dir` whose path satisfies `keep`,
/// sorted.
///
/// Fails only when `dir` itself cannot be read. Symlinks are not followed
/// during the walk; `keep` decides what a link counts as.
fn list_children(dir: &Path, keep: impl Fn(&Path) -> bool) -> io::Result<Vec<String>> {
    if !fs::metadata(dir)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::Other,
            format!("{} is not a directory", dir.display()),
        ));
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(e.into()),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !keep(entry.path()) {
            continue;
        }
        names.push(entry.file_name().to_string_lossy().to_string());
    }
    names.sort();
    Ok(names)
}

/// A symlink whose target does not exist.
fn is_dangling(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink()) && fs::metadata(path).is_err()
}

impl LogSource for ZncLogTree {
    fn root(&self) -> &Path {
        &self.root
    }

    fn root_exists(&self) -> bool {
        self.root.is_dir()
    }

    fn has_network(&self, network: &str) -> bool {
        !network.is_empty() && !network.contains(['/', '\\']) && self.root.join(network).is_dir()
    }

    fn networks(&self) -> io::Result<Vec<String>> {
        list_children(&self.root, Path::is_dir)
    }

    fn channels(&self, network: &str) -> io::Result<Option<Vec<String>>> {
        let log_dir = self.log_dir(network);
        if !log_dir.is_dir() {
            return Ok(None);
        }
        // a dangling link stays listed so the failure shows up for that channel
        list_children(&log_dir, |p| p.is_dir() || is_dangling(p)).map(Some)
    }

    fn log_files(&self, network: &str, channel: &str) -> io::Result<Vec<LogFile>> {
        let channel_dir = self.log_dir(network).join(channel);
        let names = list_children(&channel_dir, |p| {
            let is_log = p
                .file_name()
                .is_some_and(|n| n.to_string_lossy().ends_with(LOG_EXTENSION));
            is_log && (p.is_file() || is_dangling(p))
        })?;
        Ok(names
            .into_iter()
            .map(|file_name| LogFile {
                path: channel_dir.join(&file_name),
                file_name,
            })
            .collect())
    }

    fn read(&self, file: &LogFile) -> io::Result<Vec<u8>> {
        std::fs::read(&file.path)
    }
}
