//! The archive service object.
//!
//! [`LogArchive`] is built once from a [`Config`] and owns the connection
//! pool; every operation the CLI (or any other front end) needs is a method
//! on it. There is no global connection or cached state anywhere else.

use chrono::NaiveDateTime;

use crate::config::Config;
use crate::context::{self, ContextRequest, ContextWindow};
use crate::db;
use crate::error::{ArchiveError, Result};
use crate::ingest::ImportPipeline;
use crate::ledger;
use crate::migrate;
use crate::models::{ImportMode, ImportReport, Network};
use crate::search::{self, SearchRequest, SearchResponse};
use crate::source::ZncLogTree;
use crate::stats::{self, ArchiveStats};
use crate::store::SqliteStore;

pub struct LogArchive {
    config: Config,
    store: SqliteStore,
    source: ZncLogTree,
}

impl LogArchive {
    /// Connect to (and if needed create) the archive described by `config`,
    /// bringing the schema up to date.
    pub async fn open(config: Config, key: Option<&str>) -> Result<Self> {
        let pool = db::connect(&config.db.path, key).await?;
        migrate::run_migrations(&pool).await?;

        let source = ZncLogTree::new(config.source.base_path.clone());
        Ok(Self {
            config,
            store: SqliteStore::new(pool),
            source,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Import logs from the configured ZNC base path.
    pub async fn import(&self, mode: ImportMode, network: Option<&str>) -> Result<ImportReport> {
        self.pipeline().run(mode, network).await
    }

    /// [`import`](Self::import) with an explicit run timestamp.
    pub async fn import_at(
        &self,
        mode: ImportMode,
        network: Option<&str>,
        started_at: NaiveDateTime,
    ) -> Result<ImportReport> {
        self.pipeline().run_at(mode, network, started_at).await
    }

    fn pipeline(&self) -> ImportPipeline<'_, ZncLogTree> {
        ImportPipeline::new(&self.source, &self.store, &self.config.networks)
    }

    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        search::search(&self.store, req).await
    }

    pub async fn context(&self, req: &ContextRequest) -> Result<ContextWindow> {
        context::context(&self.store, req).await
    }

    pub async fn stats(&self) -> Result<ArchiveStats> {
        stats::collect_stats(&self.store).await
    }

    /// Networks known to the archive, sorted by display name.
    pub async fn networks(&self) -> Result<Vec<Network>> {
        self.store.networks().await
    }

    /// Channels with stored lines for `network`.
    pub async fn channels(&self, network: &str) -> Result<Vec<String>> {
        if network.trim().is_empty() {
            return Err(ArchiveError::invalid("network is required"));
        }
        self.store.channels(network).await
    }

    pub async fn last_import(&self) -> Result<Option<NaiveDateTime>> {
        ledger::get_last_import(self.store.pool()).await
    }

    pub async fn close(self) {
        self.store.close().await;
    }
}
