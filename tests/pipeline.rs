use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use znc_logvault::config::Config;
use znc_logvault::context::ContextRequest;
use znc_logvault::db;
use znc_logvault::models::{FileFailure, FileOutcome, SkipReason};
use znc_logvault::search::{SearchRequest, MAX_RESULTS};
use znc_logvault::{ArchiveError, ConfigurationError, ImportMode, LogArchive};

fn stamp(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

fn write_log(base: &Path, network: &str, channel: &str, file: &str, content: &str) -> PathBuf {
    let dir = base.join(network).join("moddata").join("log").join(channel);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file);
    fs::write(&path, content).unwrap();
    path
}

async fn open_archive(tmp: &TempDir) -> LogArchive {
    let base = tmp.path().join("networks");
    fs::create_dir_all(&base).unwrap();
    let config = Config::new(tmp.path().join("data/test.db"), base);
    LogArchive::open(config, None).await.unwrap()
}

fn outcome_of<'a>(
    report: &'a znc_logvault::ImportReport,
    channel: &str,
    file: &str,
) -> &'a FileOutcome {
    report
        .networks
        .iter()
        .flat_map(|n| n.files.iter())
        .find(|f| f.channel == channel && f.file_name == file)
        .map(|f| &f.outcome)
        .unwrap_or_else(|| panic!("no report for {}/{}", channel, file))
}

#[tokio::test]
async fn incremental_respects_cutoff_and_existing_files() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    write_log(&base, "n1", "#c1", "2025-12-05.log", "a\nb\n");
    archive
        .import_at(ImportMode::Full, None, stamp("2025-12-05T12:00:00"))
        .await
        .unwrap();

    write_log(&base, "n1", "#c1", "2025-12-03.log", "old\n");
    write_log(&base, "n1", "#c1", "2025-12-06.log", "new\n");
    write_log(&base, "n1", "#c2", "2025-12-05.log", "same day\n");

    let report = archive
        .import_at(ImportMode::Incremental, None, stamp("2025-12-06T08:00:00"))
        .await
        .unwrap();

    assert_eq!(report.cutoff, Some(stamp("2025-12-05T12:00:00")));
    assert_eq!(
        outcome_of(&report, "#c1", "2025-12-03.log"),
        &FileOutcome::Skipped {
            reason: SkipReason::BeforeCutoff
        }
    );
    assert_eq!(
        outcome_of(&report, "#c1", "2025-12-05.log"),
        &FileOutcome::Skipped {
            reason: SkipReason::AlreadyImported
        }
    );
    assert_eq!(
        outcome_of(&report, "#c1", "2025-12-06.log"),
        &FileOutcome::Imported { lines: 1 }
    );
    assert_eq!(
        outcome_of(&report, "#c2", "2025-12-05.log"),
        &FileOutcome::Imported { lines: 1 }
    );
    assert_eq!(report.lines_imported, 2);

    assert_eq!(
        archive.last_import().await.unwrap(),
        Some(stamp("2025-12-06T08:00:00"))
    );

    // The back-filled day only arrives with a full run
    let resp = archive.search(&SearchRequest::new("old", "n1")).await.unwrap();
    assert_eq!(resp.total, 0);
    archive
        .import_at(ImportMode::Full, None, stamp("2025-12-06T09:00:00"))
        .await
        .unwrap();
    let resp = archive.search(&SearchRequest::new("old", "n1")).await.unwrap();
    assert_eq!(resp.total, 1);
}

#[tokio::test]
async fn search_is_capped() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    let content: String = (1..=1200).map(|i| format!("line {} match\n", i)).collect();
    write_log(&base, "n1", "#big", "2025-01-01.log", &content);
    archive.import(ImportMode::Full, None).await.unwrap();

    let resp = archive.search(&SearchRequest::new("MATCH", "n1")).await.unwrap();
    assert_eq!(resp.total, MAX_RESULTS);
    assert_eq!(resp.results.len(), MAX_RESULTS);
    assert!(resp.truncated);
    assert_eq!(resp.results[0].line, 1);
    assert_eq!(resp.results[999].line, 1000);
}

#[tokio::test]
async fn search_orders_newest_date_first() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    write_log(&base, "n1", "#b", "2025-01-01.log", "ping one\n");
    write_log(&base, "n1", "#a", "2025-01-02.log", "ping two\nping three\nping four\n");
    write_log(&base, "n1", "#b", "2025-01-02.log", "ping five\n");
    archive.import(ImportMode::Full, None).await.unwrap();

    let resp = archive.search(&SearchRequest::new("ping", "n1")).await.unwrap();
    let order: Vec<(&str, &str, i64)> = resp
        .results
        .iter()
        .map(|r| (r.date.as_str(), r.channel.as_str(), r.line))
        .collect();
    assert_eq!(
        order,
        vec![
            ("2025-01-02", "#a", 1),
            ("2025-01-02", "#b", 1),
            ("2025-01-02", "#a", 2),
            ("2025-01-02", "#a", 3),
            ("2025-01-01", "#b", 1),
        ]
    );
    assert!(!resp.truncated);

    let mut req = SearchRequest::new("ping", "n1");
    req.channel = Some("#a".to_string());
    assert_eq!(archive.search(&req).await.unwrap().total, 3);
}

#[tokio::test]
async fn search_validation_errors() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;

    let err = archive.search(&SearchRequest::new("", "n1")).await.unwrap_err();
    assert!(matches!(err, ArchiveError::QueryValidation(_)));

    let mut req = SearchRequest::new("x", "n1");
    req.start_date = Some("2025-13-01".to_string());
    let err = archive.search(&req).await.unwrap_err();
    assert!(matches!(err, ArchiveError::QueryValidation(_)));

    // empty bounds are treated as absent
    let mut req = SearchRequest::new("x", "n1");
    req.end_date = Some(String::new());
    assert_eq!(archive.search(&req).await.unwrap().total, 0);
}

#[tokio::test]
async fn context_past_end_of_file() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    let content: String = (1..=8).map(|i| format!("l{}\n", i)).collect();
    write_log(&base, "n1", "#c", "2025-02-02.log", &content);
    archive.import(ImportMode::Full, None).await.unwrap();

    let window = archive
        .context(&ContextRequest::new("n1", "#c", "2025-02-02", 10))
        .await
        .unwrap();
    assert_eq!(window.start_line, 8);
    assert_eq!(window.end_line, 12);
    assert_eq!(window.total_lines, 8);
    assert_eq!(window.entries.len(), 1);
    assert_eq!(window.entries[0].line, 8);
    assert!(!window.entries[0].is_match);
    assert!(window.can_expand_up);
    assert!(!window.can_expand_down);

    let mut req = ContextRequest::new("n1", "#c", "2025-02-02", 4);
    req.lines_before = 1;
    req.lines_after = 1;
    let window = archive.context(&req).await.unwrap();
    let lines: Vec<i64> = window.entries.iter().map(|e| e.line).collect();
    assert_eq!(lines, vec![3, 4, 5]);
    assert!(window.entries[1].is_match);
    assert!(window.can_expand_up);
    assert!(window.can_expand_down);

    let window = archive
        .context(&ContextRequest::new("n1", "#c", "2025-02-02", i64::MAX))
        .await
        .unwrap();
    assert_eq!(window.end_line, i64::MAX);
    assert!(window.entries.is_empty());
    assert!(!window.can_expand_down);
}

#[tokio::test]
async fn full_reimport_drops_stale_lines() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    let path = write_log(&base, "n1", "#c", "2025-03-03.log", "one\ntwo\nthree\r\nfour  \n");
    archive.import(ImportMode::Full, None).await.unwrap();
    assert_eq!(archive.stats().await.unwrap().total_entries, 4);

    let resp = archive.search(&SearchRequest::new("four", "n1")).await.unwrap();
    assert_eq!(resp.results[0].content, "four");

    fs::write(&path, "one\n").unwrap();
    archive.import(ImportMode::Full, None).await.unwrap();

    let stats = archive.stats().await.unwrap();
    assert_eq!(stats.total_entries, 1);
    let window = archive
        .context(&ContextRequest::new("n1", "#c", "2025-03-03", 1))
        .await
        .unwrap();
    assert_eq!(window.total_lines, 1);
}

#[tokio::test]
async fn bad_filenames_do_not_abort() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    write_log(&base, "n1", "#c", "2025-04-04.log", "kept\n");
    write_log(&base, "n1", "#c", "#c_20250405.log", "legacy\n");
    write_log(&base, "n1", "#c", "2025-02-30.log", "impossible\n");
    write_log(&base, "n1", "#c", "readme.txt", "not a log\n");

    let report = archive.import(ImportMode::Full, None).await.unwrap();
    assert_eq!(report.files_imported(), 2);
    assert_eq!(report.files_skipped(), 1);
    assert_eq!(
        outcome_of(&report, "#c", "2025-02-30.log"),
        &FileOutcome::Skipped {
            reason: SkipReason::UnparseableDate
        }
    );

    let resp = archive.search(&SearchRequest::new("legacy", "n1")).await.unwrap();
    assert_eq!(resp.results[0].date, "2025-04-05");
}

#[cfg(unix)]
#[tokio::test]
async fn unreadable_files_and_channels_do_not_abort() {
    use std::os::unix::fs::symlink;

    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    write_log(&base, "a-net", "#c", "2025-01-01.log", "good line\n");
    let log_dir = base.join("a-net/moddata/log");
    symlink(log_dir.join("missing.log"), log_dir.join("#c/2025-01-02.log")).unwrap();
    symlink(log_dir.join("#nowhere"), log_dir.join("#dead")).unwrap();
    write_log(&base, "b-net", "#d", "2025-01-01.log", "later network\n");

    let report = archive
        .import_at(ImportMode::Full, None, stamp("2025-01-03T10:00:00"))
        .await
        .unwrap();

    assert_eq!(
        outcome_of(&report, "#c", "2025-01-01.log"),
        &FileOutcome::Imported { lines: 1 }
    );
    assert!(matches!(
        outcome_of(&report, "#c", "2025-01-02.log"),
        FileOutcome::Failed {
            error: FileFailure::Io(_)
        }
    ));
    assert_eq!(report.failures().count(), 1);

    let a_net = &report.networks[0];
    assert_eq!(a_net.network_id, "a-net");
    assert_eq!(a_net.failed_channels.len(), 1);
    assert_eq!(a_net.failed_channels[0].channel, "#dead");
    assert!(matches!(a_net.failed_channels[0].error, FileFailure::Io(_)));
    assert!(a_net.failure.is_none());

    assert_eq!(report.lines_for("b-net"), Some(1));
    assert_eq!(
        archive.last_import().await.unwrap(),
        Some(stamp("2025-01-03T10:00:00"))
    );

    let resp = archive.search(&SearchRequest::new("good", "a-net")).await.unwrap();
    assert_eq!(resp.total, 1);
}

#[tokio::test]
async fn failed_write_keeps_previous_content_and_continues() {
    let tmp = TempDir::new().unwrap();
    let archive = open_archive(&tmp).await;
    let base = tmp.path().join("networks");

    let path = write_log(&base, "n1", "#c", "2025-06-01.log", "kept\n");
    write_log(&base, "n1", "#c", "2025-06-02.log", "other\n");
    archive.import(ImportMode::Full, None).await.unwrap();

    // reject one line at the database level so the whole file's write fails
    let pool = db::connect(&tmp.path().join("data/test.db"), None).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_boom BEFORE INSERT ON log_entries \
         WHEN NEW.content = 'boom' BEGIN SELECT RAISE(ABORT, 'rejected'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    fs::write(&path, "fine\nboom\n").unwrap();
    write_log(&base, "n1", "#c", "2025-06-03.log", "after\n");

    let report = archive.import(ImportMode::Full, None).await.unwrap();
    assert!(matches!(
        outcome_of(&report, "#c", "2025-06-01.log"),
        FileOutcome::Failed {
            error: FileFailure::StoreWrite(_)
        }
    ));
    assert_eq!(
        outcome_of(&report, "#c", "2025-06-03.log"),
        &FileOutcome::Imported { lines: 1 }
    );

    let window = archive
        .context(&ContextRequest::new("n1", "#c", "2025-06-01", 1))
        .await
        .unwrap();
    assert_eq!(window.total_lines, 1);
    assert_eq!(window.entries[0].content, "kept");
    let resp = archive.search(&SearchRequest::new("fine", "n1")).await.unwrap();
    assert_eq!(resp.total, 0);
}

#[tokio::test]
async fn network_filter_and_display_names() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("networks");
    write_log(&base, "libera", "#rust", "2025-05-05.log", "hi\n");
    write_log(&base, "oftc", "#debian", "2025-05-05.log", "hi\n");
    fs::create_dir_all(base.join("empty")).unwrap();

    let mut config = Config::new(tmp.path().join("data/test.db"), &base);
    config
        .networks
        .insert("oftc".to_string(), "OFTC".to_string());
    let archive = LogArchive::open(config, None).await.unwrap();

    let report = archive.import(ImportMode::Full, Some("oftc")).await.unwrap();
    assert_eq!(report.networks.len(), 1);
    assert_eq!(report.networks[0].display_name, "OFTC");

    let report = archive.import(ImportMode::Full, None).await.unwrap();
    let ids: Vec<&str> = report.networks.iter().map(|n| n.network_id.as_str()).collect();
    assert_eq!(ids, vec!["empty", "libera", "oftc"]);
    assert!(report.networks[0].log_dir_missing);
    assert_eq!(report.lines_for("libera"), Some(1));
    assert_eq!(report.lines_for("empty"), Some(0));
    assert_eq!(report.lines_for("absent"), None);

    let names: Vec<String> = archive
        .networks()
        .await
        .unwrap()
        .into_iter()
        .map(|n| n.display_name)
        .collect();
    assert_eq!(names, vec!["Empty", "Libera", "OFTC"]);
    assert_eq!(archive.channels("libera").await.unwrap(), vec!["#rust"]);

    let err = archive
        .import(ImportMode::Full, Some("missing"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Configuration(ConfigurationError::NetworkNotFound { .. })
    ));
}

#[tokio::test]
async fn missing_base_path_is_a_configuration_error() {
    let tmp = TempDir::new().unwrap();
    let config = Config::new(tmp.path().join("data/test.db"), tmp.path().join("gone"));
    let archive = LogArchive::open(config, None).await.unwrap();

    let err = archive.import(ImportMode::Full, None).await.unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Configuration(ConfigurationError::SourceRootMissing(_))
    ));
    assert_eq!(archive.last_import().await.unwrap(), None);
}

#[test]
fn dates_resolve_from_both_naming_schemes() {
    use znc_logvault::dates::parse_log_date;
    let d = NaiveDate::from_ymd_opt(2025, 12, 4);
    assert_eq!(parse_log_date("2025-12-04.log"), d);
    assert_eq!(parse_log_date("#chan_20251204.log"), d);
    assert_eq!(parse_log_date("20251204.log"), d);
    assert_eq!(parse_log_date("2025-12-04.txt"), None);
}
