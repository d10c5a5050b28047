use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::EnvFilter;

use crate::stats::BatchStats;

pub const DEFAULT_RUN_LOG: &str = ".subnorm/runs.jsonl";
const MAX_ENTRIES: usize = 500;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "subnorm=debug" } else { "subnorm=info" })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("installing tracing subscriber: {err}"))
}

#[derive(Debug, Serialize)]
struct RunLogEntry<'a> {
    timestamp: &'a str,
    command: &'a str,
    target: &'a str,
    total: usize,
    successful: usize,
    failed: usize,
    skipped: usize,
    #[serde(rename = "timeTaken")]
    time_taken_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunRecord {
    pub timestamp: String,
    pub command: String,
    pub target: String,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    #[serde(rename = "timeTaken")]
    pub time_taken_ms: u64,
}

/// Appends one JSON line describing a finished run, keeping only the most
/// recent entries.
pub fn record_run(log_path: &Path, command: &str, target: &str, stats: &BatchStats) -> Result<()> {
    if let Some(parent) = log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("creating {parent:?}"))?;
    }
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = RunLogEntry {
        timestamp: &timestamp,
        command,
        target,
        total: stats.total,
        successful: stats.successful,
        failed: stats.failed,
        skipped: stats.skipped,
        time_taken_ms: stats.time_taken_ms,
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(log_path)
        .with_context(|| format!("opening {log_path:?}"))?;
    writeln!(file, "{json}")?;
    truncate_log(log_path)
}

/// Returns up to `tail` most recent runs, oldest first. Lines that do not
/// parse are skipped.
pub fn read_recent(log_path: &Path, tail: usize) -> Result<Vec<RunRecord>> {
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let file = OpenOptions::new()
        .read(true)
        .open(log_path)
        .with_context(|| format!("reading {log_path:?}"))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if let Ok(record) = serde_json::from_str::<RunRecord>(&line) {
            records.push(record);
        }
    }
    let start = records.len().saturating_sub(tail);
    Ok(records.split_off(start))
}

fn truncate_log(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {path:?}"))?;
    let lines: Vec<_> = BufReader::new(file).lines().collect::<Result<_, _>>()?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n").with_context(|| format!("rewriting {path:?}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    fn finished_stats() -> BatchStats {
        let mut stats = BatchStats::started_now();
        stats.register_directory(Path::new("subs"), 2);
        stats.successful = 1;
        stats.skipped = 1;
        stats.finish(Duration::from_millis(12));
        stats
    }

    #[test]
    fn appends_json_lines_and_creates_parent() {
        let dir = tempdir().expect("temp dir");
        let log = dir.path().join("nested/runs.jsonl");
        let stats = finished_stats();
        record_run(&log, "batch", "subs/*.srt", &stats).expect("first");
        record_run(&log, "convert", "subs/a.srt", &stats).expect("second");

        let text = fs::read_to_string(&log).expect("read log");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let entry: serde_json::Value = serde_json::from_str(lines[0]).expect("json");
        assert_eq!(entry["command"], "batch");
        assert_eq!(entry["total"], 2);
        assert_eq!(entry["skipped"], 1);
        assert_eq!(entry["timeTaken"], 12);
        assert!(entry["timestamp"].as_str().is_some_and(|t| t.contains('T')));
    }

    #[test]
    fn reads_recent_runs_and_skips_foreign_lines() {
        let dir = tempdir().expect("temp dir");
        let log = dir.path().join("runs.jsonl");
        assert!(read_recent(&log, 5).expect("missing log").is_empty());

        let stats = finished_stats();
        for target in ["a", "b", "c"] {
            record_run(&log, "batch", target, &stats).expect("record");
        }
        let mut text = fs::read_to_string(&log).expect("read log");
        text.push_str("not json\n");
        fs::write(&log, text).expect("rewrite log");

        let recent = read_recent(&log, 2).expect("read");
        let targets: Vec<_> = recent.iter().map(|r| r.target.as_str()).collect();
        assert_eq!(targets, vec!["b", "c"]);
        assert_eq!(recent[0].skipped, 1);
    }

    #[test]
    fn keeps_only_recent_entries() {
        let dir = tempdir().expect("temp dir");
        let log = dir.path().join("runs.jsonl");
        let stale: String = (0..MAX_ENTRIES)
            .map(|i| format!("{{\"old\":{i}}}\n"))
            .collect();
        fs::write(&log, stale).expect("seed log");

        record_run(&log, "batch", "x", &finished_stats()).expect("record");

        let text = fs::read_to_string(&log).expect("read log");
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), MAX_ENTRIES);
        assert_eq!(lines[0], "{\"old\":1}");
        assert!(lines[MAX_ENTRIES - 1].contains("\"command\":\"batch\""));
    }
}
