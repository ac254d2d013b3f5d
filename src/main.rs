//! # ZNC Log Vault CLI (`zlog`)
//!
//! The `zlog` binary imports ZNC channel logs into the archive and queries
//! them.
//!
//! ## Usage
//!
//! ```bash
//! zlog --config ./config/zlog.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `zlog init` | Create the database and run schema migrations |
//! | `zlog import` | Import logs (full by default, `--incremental` for new days only) |
//! | `zlog search "<query>" --network <id>` | Substring search |
//! | `zlog context ...` | Show lines around a line |
//! | `zlog stats` | Archive statistics |
//! | `zlog networks` | List networks |
//! | `zlog channels <network>` | List channels of a network |
//! | `zlog completions <shell>` | Print shell completions |

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use znc_logvault::config::{self, Config};
use znc_logvault::context::{print_window, ContextRequest, DEFAULT_LINES_AFTER, DEFAULT_LINES_BEFORE};
use znc_logvault::models::FileOutcome;
use znc_logvault::search::{print_results, SearchRequest};
use znc_logvault::stats::{format_number, print_stats};
use znc_logvault::{ImportMode, ImportReport, LogArchive};

/// ZNC Log Vault: import ZNC logs into an encrypted SQLite archive and
/// search them.
#[derive(Parser)]
#[command(name = "zlog", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/zlog.toml")]
    config: PathBuf,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent: running it on an existing archive is safe.
    Init,

    /// Import logs from the configured ZNC base path.
    ///
    /// Without `--incremental` every log file replaces its stored copy.
    /// With it, only days that are not stored yet and are dated on or after
    /// the previous run are added. Days older than the previous run that
    /// appear later are only picked up by a full import.
    Import {
        /// Only import logs that are new since the last import.
        #[arg(long)]
        incremental: bool,

        /// Import only this network (folder name under the base path).
        #[arg(long)]
        network: Option<String>,

        /// Print the import report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Search log lines containing a substring.
    Search {
        /// Text to search for.
        query: String,

        /// Network to search (folder name).
        #[arg(long)]
        network: String,

        /// Restrict to one channel.
        #[arg(long)]
        channel: Option<String>,

        /// Only logs on or after this date (YYYY-MM-DD).
        #[arg(long)]
        from: Option<String>,

        /// Only logs on or before this date (YYYY-MM-DD).
        #[arg(long)]
        to: Option<String>,

        /// Match case exactly.
        #[arg(long)]
        case_sensitive: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show the lines around one log line.
    Context {
        #[arg(long)]
        network: String,

        #[arg(long)]
        channel: String,

        /// Log date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// Line number at the center of the window.
        #[arg(long)]
        line: i64,

        /// Lines to show before the center line.
        #[arg(long, default_value_t = DEFAULT_LINES_BEFORE)]
        before: u32,

        /// Lines to show after the center line.
        #[arg(long, default_value_t = DEFAULT_LINES_AFTER)]
        after: u32,

        #[arg(long)]
        json: bool,
    },

    /// Show archive statistics.
    Stats {
        #[arg(long)]
        json: bool,
    },

    /// List networks in the archive.
    Networks,

    /// List channels of a network.
    Channels {
        network: String,
    },

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "zlog", &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;
    let archive = open(cfg).await?;
    let result = dispatch(&archive, cli.command).await;
    archive.close().await;
    result
}

async fn open(cfg: Config) -> Result<LogArchive> {
    let key = cfg.resolved_key()?;
    Ok(LogArchive::open(cfg, key.as_deref()).await?)
}

async fn dispatch(archive: &LogArchive, command: Commands) -> Result<()> {
    match command {
        Commands::Init => {
            println!("Database initialized successfully.");
        }
        Commands::Import {
            incremental,
            network,
            json,
        } => {
            let mode = if incremental {
                ImportMode::Incremental
            } else {
                ImportMode::Full
            };
            let report = archive.import(mode, network.as_deref()).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_import_report(&report);
                let stats = archive.stats().await?;
                println!("  Total lines in database: {}", format_number(stats.total_entries));
                println!("  Networks: {}", stats.network_count);
                println!("  Channels: {}", stats.channel_count);
                println!(
                    "  Date range: {} to {}",
                    stats.date_range.start.as_deref().unwrap_or("-"),
                    stats.date_range.end.as_deref().unwrap_or("-")
                );
                println!("ok");
            }
        }
        Commands::Search {
            query,
            network,
            channel,
            from,
            to,
            case_sensitive,
            json,
        } => {
            let req = SearchRequest {
                query,
                network,
                channel,
                start_date: from,
                end_date: to,
                case_sensitive,
            };
            let resp = archive.search(&req).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&resp)?);
            } else {
                print_results(&resp);
            }
        }
        Commands::Context {
            network,
            channel,
            date,
            line,
            before,
            after,
            json,
        } => {
            let req = ContextRequest {
                network,
                channel,
                date,
                line,
                lines_before: before,
                lines_after: after,
            };
            let window = archive.context(&req).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&window)?);
            } else {
                print_window(&req, &window);
            }
        }
        Commands::Stats { json } => {
            let stats = archive.stats().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_stats(&stats, &archive.config().db.path);
            }
        }
        Commands::Networks => {
            let networks = archive.networks().await?;
            if networks.is_empty() {
                println!("No networks imported.");
            }
            for n in networks {
                println!("{:<24} {}", n.id, n.display_name);
            }
        }
        Commands::Channels { network } => {
            for channel in archive.channels(&network).await? {
                println!("{}", channel);
            }
        }
        Commands::Completions { .. } => unreachable!("handled before config loading"),
    }

    Ok(())
}

fn print_import_report(report: &ImportReport) {
    match (report.mode, report.cutoff) {
        (ImportMode::Incremental, Some(cutoff)) => {
            println!("import (incremental, logs from {} on)", cutoff.date())
        }
        (ImportMode::Incremental, None) => println!("import (incremental, no previous import)"),
        (ImportMode::Full, _) => println!("import (full)"),
    }

    for net in &report.networks {
        println!("  network: {} ({})", net.network_id, net.display_name);
        if net.log_dir_missing {
            println!("    log directory not found");
            continue;
        }
        if let Some(ref failure) = net.failure {
            println!("    failed: {}", failure);
            continue;
        }
        println!("    channels: {}", net.channels);
        for failed in &net.failed_channels {
            println!("    channel {} failed: {}", failed.channel, failed.error);
        }
        println!("    lines imported: {}", format_number(net.lines_imported as i64));
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("  failed files:");
        for (network, file) in failures {
            if let FileOutcome::Failed { ref error } = file.outcome {
                println!("    {}/{}/{}: {}", network, file.channel, file.file_name, error);
            }
        }
    }

    println!("  files imported: {}", report.files_imported());
    println!("  files skipped: {}", report.files_skipped());
    println!("  lines imported: {}", format_number(report.lines_imported as i64));
}
