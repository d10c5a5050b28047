use std::path::Path;

use tracing::{debug, info, warn};

use crate::stats::{DirectoryStats, FileOutcome};

/// Receives batch events. Calls arrive from concurrently running units, so
/// implementations must tolerate any interleaving.
pub trait ProgressSink: Send + Sync {
    fn batch_started(&self, _total_files: usize, _directories: usize) {}

    fn no_matches(&self, _pattern: &str) {}

    fn file_finished(&self, _file: &Path, _outcome: &FileOutcome) {}

    fn directory_finished(&self, _dir: &Path, _stats: &DirectoryStats) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// Reports progress through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn batch_started(&self, total_files: usize, directories: usize) {
        info!("converting {total_files} files in {directories} directories");
    }

    fn no_matches(&self, pattern: &str) {
        warn!("no files matched '{pattern}'");
    }

    fn file_finished(&self, file: &Path, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Succeeded { attempts } => {
                info!("converted {} (attempts: {attempts})", file.display())
            }
            FileOutcome::Failed { attempts, error } => {
                warn!("failed {} after {attempts} attempts: {error}", file.display())
            }
            FileOutcome::Skipped => debug!("skipped {} (output exists)", file.display()),
        }
    }

    fn directory_finished(&self, dir: &Path, stats: &DirectoryStats) {
        info!(
            "finished {}: {} ok, {} failed, {} skipped of {}",
            dir.display(),
            stats.successful,
            stats.failed,
            stats.skipped,
            stats.total
        );
    }
}
