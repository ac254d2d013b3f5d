//! # ZNC Log Vault
//!
//! **Imports ZNC channel logs into an indexed, encrypted SQLite archive and
//! answers substring searches over them.**
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  ZNC log dir │──▶│   Import     │──▶│    SQLite    │
//! │ net/chan/day │   │  pipeline    │   │ (WAL, keyed) │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              │
//!                         ┌────────────────────┤
//!                         ▼                    ▼
//!                   ┌──────────┐        ┌────────────┐
//!                   │  search  │        │  context / │
//!                   │          │        │   stats    │
//!                   └──────────┘        └────────────┘
//! ```
//!
//! ## Data Flow
//!
//! 1. The **log source** ([`source`]) lists networks, channels and dated
//!    `.log` files under `<base>/<network>/moddata/log/<channel>/`.
//! 2. Each filename is resolved to a calendar date ([`dates`]).
//! 3. The **import pipeline** ([`ingest`]) writes each file as one logical
//!    file, atomically, in full (replace) or incremental (fill-in) mode.
//! 4. The **ledger** ([`ledger`]) records when the last run happened.
//! 5. The **query engine** ([`search`], [`context`], [`stats`]) reads the
//!    store while imports may be running.
//!
//! ## Quick Start
//!
//! ```bash
//! zlog init                               # create database
//! zlog import                             # full import of every network
//! zlog import --incremental               # only new days since last run
//! zlog search "hello" --network libera
//! zlog context --network libera --channel '#rust' --date 2025-12-04 --line 42
//! zlog stats
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`archive`] | `LogArchive` service object: one handle, every operation |
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types and import reports |
//! | [`error`] | Error taxonomy |
//! | [`dates`] | Date resolution from log filenames |
//! | [`source`] | ZNC log directory tree |
//! | [`ingest`] | Import pipeline: source → dates → skip rules → store |
//! | [`ledger`] | Last-import timestamp |
//! | [`store`] | SQLite reads and transactional writes |
//! | [`search`] | Capped substring search |
//! | [`context`] | Expandable windows around a line |
//! | [`stats`] | Archive statistics |
//! | [`db`] | SQLite connection pool with WAL mode and key pragma |
//! | [`migrate`] | Database schema migrations (idempotent) |

pub mod archive;
pub mod config;
pub mod context;
pub mod dates;
pub mod db;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod migrate;
pub mod models;
pub mod search;
pub mod source;
pub mod stats;
pub mod store;

pub use archive::LogArchive;
pub use error::{ArchiveError, ConfigurationError};
pub use models::{ImportMode, ImportReport};
