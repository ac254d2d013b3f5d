//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/znc_logs.db"
//! key_env = "ZLOG_DB_KEY"
//!
//! [source]
//! base_path = "/home/me/.znc/users/me/networks"
//!
//! [networks]
//! libera = "Libera"
//! ```

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
    /// Folder name → display name. Folders without an entry get a
    /// capitalized version of their name.
    #[serde(default)]
    pub networks: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    /// Credential handed to the backend verbatim.
    #[serde(default)]
    pub key: Option<String>,
    /// Name of an environment variable holding the credential.
    #[serde(default)]
    pub key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub base_path: PathBuf,
}

impl Config {
    /// Build a config in code, without a TOML file.
    pub fn new(db_path: impl Into<PathBuf>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db: DbConfig {
                path: db_path.into(),
                key: None,
                key_env: None,
            },
            source: SourceConfig {
                base_path: base_path.into(),
            },
            networks: BTreeMap::new(),
        }
    }

    /// The credential used to unlock the store, if any.
    pub fn resolved_key(&self) -> Result<Option<String>> {
        if let Some(ref key) = self.db.key {
            return Ok(Some(key.clone()));
        }
        match self.db.key_env {
            Some(ref var) => {
                let key = std::env::var(var)
                    .with_context(|| format!("db.key_env: environment variable {} is not set", var))?;
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;

    // Surface a missing key_env variable at startup rather than on first connect
    config.resolved_key()?;

    Ok(config)
}

fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if config.db.path.as_os_str().is_empty() {
        bail!("db.path must not be empty");
    }

    if config.source.base_path.as_os_str().is_empty() {
        bail!("source.base_path must not be empty");
    }

    if config.db.key.is_some() && config.db.key_env.is_some() {
        bail!("db.key and db.key_env are mutually exclusive");
    }

    for (network, name) in &config.networks {
        if name.trim().is_empty() {
            bail!("networks.{}: display name must not be empty", network);
        }
    }

    Ok(config)
}
