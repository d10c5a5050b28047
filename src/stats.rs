use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;

/// Terminal state of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, error: String },
    Skipped,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileError {
    pub file: PathBuf,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errors: Vec<FileError>,
    #[serde(rename = "timeTaken")]
    pub time_taken_ms: u64,
    #[serde(rename = "averageTimePerFile")]
    pub average_time_per_file_ms: f64,
    pub directories_processed: usize,
    pub files_by_directory: BTreeMap<String, DirectoryStats>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

impl BatchStats {
    pub fn started_now() -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
            errors: Vec::new(),
            time_taken_ms: 0,
            average_time_per_file_ms: 0.0,
            directories_processed: 0,
            files_by_directory: BTreeMap::new(),
            start_time: now,
            end_time: now,
        }
    }

    pub fn directory_key(dir: &Path) -> String {
        dir.to_string_lossy().into_owned()
    }

    pub fn register_directory(&mut self, dir: &Path, files: usize) {
        self.total += files;
        self.files_by_directory
            .entry(Self::directory_key(dir))
            .or_default()
            .total += files;
    }

    /// Updates the aggregate counters and the directory bucket together.
    pub fn record(&mut self, dir: &Path, file: &Path, outcome: &FileOutcome) {
        let bucket = self
            .files_by_directory
            .entry(Self::directory_key(dir))
            .or_default();
        match outcome {
            FileOutcome::Succeeded { .. } => {
                self.successful += 1;
                bucket.successful += 1;
            }
            FileOutcome::Failed { error, .. } => {
                self.failed += 1;
                bucket.failed += 1;
                self.errors.push(FileError {
                    file: file.to_path_buf(),
                    error: error.clone(),
                });
            }
            FileOutcome::Skipped => {
                self.skipped += 1;
                bucket.skipped += 1;
            }
        }
    }

    pub fn directory(&self, dir: &Path) -> Option<&DirectoryStats> {
        self.files_by_directory.get(&Self::directory_key(dir))
    }

    pub fn finish(&mut self, elapsed: Duration) {
        self.end_time = OffsetDateTime::now_utc();
        self.time_taken_ms = elapsed.as_millis().try_into().unwrap_or(u64::MAX);
        let processed = self.successful + self.failed;
        self.average_time_per_file_ms = if processed > 0 {
            elapsed.as_secs_f64() * 1000.0 / processed as f64
        } else {
            0.0
        };
    }

    pub fn is_consistent(&self) -> bool {
        self.total == self.successful + self.failed + self.skipped
            && self.files_by_directory.values().all(|bucket| {
                bucket.total == bucket.successful + bucket.failed + bucket.skipped
            })
    }

    pub fn summary(&self) -> String {
        format!(
            "total={}, successful={}, failed={}, skipped={}, directories={}, time={}ms, avg={:.1}ms",
            self.total,
            self.successful,
            self.failed,
            self.skipped,
            self.directories_processed,
            self.time_taken_ms,
            self.average_time_per_file_ms
        )
    }
}
