use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::fs;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::BatchOptions;
use crate::convert::FileConverter;
use crate::error::BatchError;
use crate::files::{DirectoryGroup, discover, group_by_directory};
use crate::output::{batch_destination, mirrored_directory};
use crate::progress::ProgressSink;
use crate::stats::{BatchStats, FileError, FileOutcome};

/// Drives a whole batch: discovery, per-directory grouping, bounded
/// concurrency, retries and fail-fast.
pub struct BatchScheduler {
    converter: Arc<dyn FileConverter>,
    progress: Arc<dyn ProgressSink>,
}

struct RunContext {
    converter: Arc<dyn FileConverter>,
    progress: Arc<dyn ProgressSink>,
    options: BatchOptions,
    base: PathBuf,
    stats: Mutex<BatchStats>,
    stop: AtomicBool,
    abort: Mutex<Option<FileError>>,
}

impl RunContext {
    fn stopped(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    async fn record(&self, dir: &Path, file: &Path, outcome: FileOutcome) {
        self.stats.lock().await.record(dir, file, &outcome);
        self.progress.file_finished(file, &outcome);
    }

    async fn trip_fail_fast(&self, file: &Path, error: &str) {
        self.stop.store(true, Ordering::SeqCst);
        let mut abort = self.abort.lock().await;
        if abort.is_none() {
            *abort = Some(FileError {
                file: file.to_path_buf(),
                error: error.to_string(),
            });
        }
    }
}

impl BatchScheduler {
    pub fn new(converter: Arc<dyn FileConverter>, progress: Arc<dyn ProgressSink>) -> Self {
        Self {
            converter,
            progress,
        }
    }

    /// Converts every file matched by `pattern`.
    ///
    /// Per-file failures are counted, not returned, unless `fail_fast` is set;
    /// then the first file to exhaust its retries stops further dispatch and
    /// the call returns [`BatchError::Aborted`] once in-flight units finish.
    pub async fn process_batch(
        &self,
        pattern: &str,
        options: &BatchOptions,
    ) -> Result<BatchStats, BatchError> {
        let started = Instant::now();
        let mut stats = BatchStats::started_now();

        let discovery = discover(pattern, &options.batch)?;
        if discovery.files.is_empty() {
            self.progress.no_matches(pattern);
            stats.finish(started.elapsed());
            return Ok(stats);
        }

        let groups = group_by_directory(&discovery.files);
        prepare_output_directories(&discovery.base, &groups, options).await?;
        for group in &groups {
            stats.register_directory(&group.directory, group.files.len());
        }
        self.progress.batch_started(discovery.files.len(), groups.len());
        debug!(
            "dispatching {} directories (parallel: {}, directory width: {}, chunk size: {})",
            groups.len(),
            options.batch.parallel,
            options.batch.directory_concurrency,
            options.batch.chunk_size
        );

        let ctx = Arc::new(RunContext {
            converter: Arc::clone(&self.converter),
            progress: Arc::clone(&self.progress),
            options: options.clone(),
            base: discovery.base,
            stats: Mutex::new(stats),
            stop: AtomicBool::new(false),
            abort: Mutex::new(None),
        });

        let width = if options.batch.parallel {
            options.batch.directory_concurrency.max(1)
        } else {
            1
        };
        for wave in groups.chunks(width) {
            if ctx.stopped() {
                debug!("fail-fast raised; not dispatching further directories");
                break;
            }
            let mut set = JoinSet::new();
            for group in wave {
                set.spawn(process_directory(Arc::clone(&ctx), group.clone()));
            }
            while let Some(joined) = set.join_next().await {
                joined??;
            }
        }

        let mut stats = ctx.stats.lock().await.clone();
        stats.finish(started.elapsed());
        info!("batch finished: {}", stats.summary());

        if let Some(failure) = ctx.abort.lock().await.take() {
            return Err(BatchError::Aborted {
                file: failure.file,
                message: failure.error,
                stats: Box::new(stats),
            });
        }
        Ok(stats)
    }
}

async fn prepare_output_directories(
    base: &Path,
    groups: &[DirectoryGroup],
    options: &BatchOptions,
) -> Result<(), BatchError> {
    let Some(output_dir) = options.batch.output_dir.as_deref() else {
        return Ok(());
    };
    create_dir(output_dir).await?;
    if options.batch.preserve_structure {
        for group in groups {
            create_dir(&mirrored_directory(&group.directory, base, output_dir, true)).await?;
        }
    }
    Ok(())
}

async fn create_dir(path: &Path) -> Result<(), BatchError> {
    fs::create_dir_all(path)
        .await
        .map_err(|source| BatchError::CreateDir {
            path: path.to_path_buf(),
            source,
        })
}

async fn process_directory(ctx: Arc<RunContext>, group: DirectoryGroup) -> Result<(), BatchError> {
    let width = if ctx.options.batch.parallel {
        ctx.options.batch.chunk_size.max(1)
    } else {
        1
    };

    for chunk in group.files.chunks(width) {
        if ctx.stopped() {
            return Ok(());
        }
        let mut set = JoinSet::new();
        for file in chunk {
            set.spawn(process_file(
                Arc::clone(&ctx),
                group.directory.clone(),
                file.clone(),
            ));
        }
        while let Some(joined) = set.join_next().await {
            joined?;
        }
    }

    let bucket = {
        let mut stats = ctx.stats.lock().await;
        stats.directories_processed += 1;
        stats
            .directory(&group.directory)
            .cloned()
            .unwrap_or_default()
    };
    ctx.progress.directory_finished(&group.directory, &bucket);
    Ok(())
}

/// An unreadable destination counts as absent; the converter then reports
/// the real problem for that file.
async fn output_exists(path: &Path) -> bool {
    match fs::try_exists(path).await {
        Ok(exists) => exists,
        Err(err) => {
            warn!("could not check {}: {err}; converting anyway", path.display());
            false
        }
    }
}

async fn process_file(ctx: Arc<RunContext>, dir: PathBuf, file: PathBuf) {
    let options = &ctx.options;
    let destination = batch_destination(&file, &ctx.base, options);

    if options.batch.skip_existing
        && destination != file
        && output_exists(&destination).await
    {
        ctx.record(&dir, &file, FileOutcome::Skipped).await;
        return;
    }

    let max_attempts = options.common.retry_count + 1;
    let mut last_error = String::new();
    for attempt in 1..=max_attempts {
        if attempt > 1 {
            tokio::time::sleep(options.common.retry_delay).await;
        }
        match ctx
            .converter
            .process_file(&file, Some(&destination), &options.common)
            .await
        {
            Ok(result) => {
                debug!(
                    "{} -> {} (attempt {attempt})",
                    file.display(),
                    result.output_path.display()
                );
                ctx.record(&dir, &file, FileOutcome::Succeeded { attempts: attempt })
                    .await;
                return;
            }
            Err(err) => {
                if attempt < max_attempts {
                    warn!(
                        "attempt {attempt}/{max_attempts} failed for {}: {err}; retrying in {:?}",
                        file.display(),
                        options.common.retry_delay
                    );
                }
                last_error = err.to_string();
            }
        }
    }

    ctx.record(
        &dir,
        &file,
        FileOutcome::Failed {
            attempts: max_attempts,
            error: last_error.clone(),
        },
    )
    .await;
    if options.common.fail_fast {
        ctx.trip_fail_fast(&file, &last_error).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::tempdir;

    use crate::config::ConversionOptions;
    use crate::convert::{ConversionResult, SubtitleConverter};
    use crate::error::ConvertError;
    use crate::progress::NoProgress;
    use crate::stats::DirectoryStats;

    /// Fails every file whose file name contains one of `failing`.
    #[derive(Default)]
    struct ScriptedConverter {
        failing: Vec<&'static str>,
        delay: Duration,
        calls: std::sync::Mutex<Vec<PathBuf>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        active_dirs: std::sync::Mutex<HashMap<PathBuf, usize>>,
        max_active_dirs: AtomicUsize,
    }

    impl ScriptedConverter {
        fn failing(names: &[&'static str]) -> Self {
            Self {
                failing: names.to_vec(),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<PathBuf> {
            self.calls.lock().unwrap().clone()
        }

        fn calls_for(&self, name: &str) -> usize {
            self.calls()
                .iter()
                .filter(|path| path.file_name().is_some_and(|n| n == name))
                .count()
        }
    }

    #[async_trait]
    impl FileConverter for ScriptedConverter {
        async fn process_file(
            &self,
            input: &Path,
            output: Option<&Path>,
            _options: &ConversionOptions,
        ) -> Result<ConversionResult, ConvertError> {
            self.calls.lock().unwrap().push(input.to_path_buf());
            let parent = input.parent().map(Path::to_path_buf).unwrap_or_default();
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            {
                let mut dirs = self.active_dirs.lock().unwrap();
                *dirs.entry(parent.clone()).or_default() += 1;
                self.max_active_dirs.fetch_max(dirs.len(), Ordering::SeqCst);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            {
                let mut dirs = self.active_dirs.lock().unwrap();
                if let Some(count) = dirs.get_mut(&parent) {
                    *count -= 1;
                    if *count == 0 {
                        dirs.remove(&parent);
                    }
                }
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if self.failing.iter().any(|needle| name.contains(needle)) {
                return Err(ConvertError::io(
                    format!("writing {}", input.display()),
                    std::io::Error::other("simulated failure"),
                ));
            }
            Ok(ConversionResult {
                output_path: output.map(Path::to_path_buf).unwrap_or_default(),
                backup_path: None,
            })
        }
    }

    #[derive(Default)]
    struct RecordingProgress {
        no_matches: AtomicUsize,
        files: AtomicUsize,
        directories: std::sync::Mutex<Vec<(PathBuf, DirectoryStats)>>,
    }

    impl ProgressSink for RecordingProgress {
        fn no_matches(&self, _pattern: &str) {
            self.no_matches.fetch_add(1, Ordering::SeqCst);
        }

        fn file_finished(&self, _file: &Path, _outcome: &FileOutcome) {
            self.files.fetch_add(1, Ordering::SeqCst);
        }

        fn directory_finished(&self, dir: &Path, stats: &DirectoryStats) {
            self.directories
                .lock()
                .unwrap()
                .push((dir.to_path_buf(), stats.clone()));
        }
    }

    fn write_files(root: &Path, names: &[&str]) {
        for name in names {
            let path = root.join(name);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, "1\n00:00:01,000 --> 00:00:02,000\nHi\n").unwrap();
        }
    }

    fn pattern(root: &Path, tail: &str) -> String {
        format!("{}/{tail}", root.to_string_lossy().replace('\\', "/"))
    }

    fn scheduler(converter: Arc<ScriptedConverter>) -> BatchScheduler {
        BatchScheduler::new(converter, Arc::new(NoProgress))
    }

    #[tokio::test]
    async fn sequential_single_directory_scenario() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &["a.srt", "b.srt", "c.srt"]);
        let converter = Arc::new(ScriptedConverter::default());
        let mut options = BatchOptions::default();
        options.batch.parallel = false;
        options.batch.chunk_size = 1;

        let stats = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*.srt"), &options)
            .await
            .unwrap();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.successful, 3);
        assert_eq!(stats.directories_processed, 1);
        assert_eq!(stats.files_by_directory.len(), 1);
        assert_eq!(stats.files_by_directory.values().next().unwrap().total, 3);
        assert_eq!(converter.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn zero_matches_returns_empty_stats_and_warns() {
        let dir = tempdir().unwrap();
        let progress = Arc::new(RecordingProgress::default());
        let scheduler = BatchScheduler::new(Arc::new(ScriptedConverter::default()), progress.clone());

        let stats = scheduler
            .process_batch(&pattern(dir.path(), "*.srt"), &BatchOptions::default())
            .await
            .unwrap();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.directories_processed, 0);
        assert_eq!(progress.no_matches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_pattern_is_fatal() {
        let dir = tempdir().unwrap();
        let err = scheduler(Arc::new(ScriptedConverter::default()))
            .process_batch(&pattern(dir.path(), "[*.srt"), &BatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BatchError::InvalidPattern { .. }));
    }

    #[tokio::test]
    async fn retries_are_bounded_and_delayed() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &["bad.srt"]);
        let converter = Arc::new(ScriptedConverter::failing(&["bad"]));
        let mut options = BatchOptions::default();
        options.common.retry_count = 2;
        options.common.retry_delay = Duration::from_millis(10);

        let started = Instant::now();
        let stats = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*.srt"), &options)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_millis(20));
        assert_eq!(converter.calls_for("bad.srt"), 3);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].error.contains("simulated failure"));
        assert!(stats.time_taken_ms >= 20);
    }

    #[tokio::test]
    async fn skip_existing_never_invokes_converter() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &["a.srt", "b.srt"]);
        std::fs::write(dir.path().join("a.subnorm.srt"), "done").unwrap();
        let converter = Arc::new(ScriptedConverter::default());
        let mut options = BatchOptions::default();
        options.batch.skip_existing = true;

        let stats = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "?.srt"), &options)
            .await
            .unwrap();

        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.successful, 1);
        assert_eq!(converter.calls_for("a.srt"), 0);
        assert_eq!(converter.calls_for("b.srt"), 1);
    }

    #[tokio::test]
    async fn failures_are_recorded_without_stopping() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &["one/a.srt", "one/bad.srt", "two/c.srt"]);
        let converter = Arc::new(ScriptedConverter::failing(&["bad"]));

        let stats = scheduler(converter)
            .process_batch(&pattern(dir.path(), "*/*.srt"), &BatchOptions::default())
            .await
            .unwrap();

        assert_eq!((stats.total, stats.successful, stats.failed), (3, 2, 1));
        assert_eq!(stats.directories_processed, 2);
        let one = stats.directory(&dir.path().join("one")).unwrap();
        assert_eq!((one.total, one.successful, one.failed), (2, 1, 1));
        assert!(stats.errors[0].file.ends_with("bad.srt"));
    }

    #[tokio::test]
    async fn fail_fast_stops_dispatch_and_rejects() {
        let dir = tempdir().unwrap();
        write_files(
            dir.path(),
            &["a/1_bad.srt", "a/2.srt", "a/3.srt", "b/4.srt", "c/5.srt"],
        );
        let converter = Arc::new(ScriptedConverter::failing(&["bad"]));
        let mut options = BatchOptions::default();
        options.batch.parallel = false;
        options.common.fail_fast = true;
        options.common.retry_count = 1;

        let err = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*/*.srt"), &options)
            .await
            .unwrap_err();

        match err {
            BatchError::Aborted { file, message, stats } => {
                assert!(file.ends_with("1_bad.srt"));
                assert!(message.contains("simulated failure"));
                assert_eq!(stats.failed, 1);
                assert_eq!(stats.successful, 0);
                assert_eq!(stats.directories_processed, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(converter.calls().len(), 2);
    }

    #[tokio::test]
    async fn fail_fast_lets_in_flight_units_finish() {
        let dir = tempdir().unwrap();
        write_files(dir.path(), &["1_bad.srt", "2.srt", "3.srt", "4.srt", "5.srt"]);
        let converter = Arc::new(ScriptedConverter::failing(&["bad"]));
        let mut options = BatchOptions::default();
        options.batch.chunk_size = 3;
        options.common.fail_fast = true;

        let err = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*.srt"), &options)
            .await
            .unwrap_err();

        let BatchError::Aborted { stats, .. } = err else {
            panic!("expected abort");
        };
        assert_eq!(converter.calls().len(), 3);
        assert_eq!((stats.failed, stats.successful), (1, 2));
    }

    #[tokio::test]
    async fn parallel_chunks_overlap_but_stay_bounded() {
        let dir = tempdir().unwrap();
        let names: Vec<String> = (0..7).map(|i| format!("{i}.srt")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_files(dir.path(), &refs);
        let converter = Arc::new(ScriptedConverter {
            delay: Duration::from_millis(5),
            ..Default::default()
        });
        let mut options = BatchOptions::default();
        options.batch.chunk_size = 3;

        let stats = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*.srt"), &options)
            .await
            .unwrap();

        let peak = converter.max_in_flight.load(Ordering::SeqCst);
        assert!(peak > 1 && peak <= 3, "peak {peak}");
        assert_eq!(stats.successful, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn directory_waves_stay_within_width() {
        let dir = tempdir().unwrap();
        let mut names = Vec::new();
        for d in 0..7 {
            for f in 0..4 {
                names.push(format!("dir{d}/{f}.srt"));
            }
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_files(dir.path(), &refs);
        let converter = Arc::new(ScriptedConverter {
            delay: Duration::from_millis(10),
            ..Default::default()
        });

        let options = BatchOptions::default();
        assert_eq!(options.batch.directory_concurrency, 3);
        let stats = scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*/*.srt"), &options)
            .await
            .unwrap();

        let peak_dirs = converter.max_active_dirs.load(Ordering::SeqCst);
        assert!(peak_dirs > 1 && peak_dirs <= 3, "peak directories {peak_dirs}");
        assert!(converter.max_in_flight.load(Ordering::SeqCst) <= 3 * 4);
        assert_eq!(stats.successful, 28);
        assert_eq!(stats.directories_processed, 7);

        let converter = Arc::new(ScriptedConverter {
            delay: Duration::from_millis(2),
            ..Default::default()
        });
        let mut options = BatchOptions::default();
        options.batch.directory_concurrency = 16;
        options.batch.parallel = false;
        scheduler(converter.clone())
            .process_batch(&pattern(dir.path(), "*/*.srt"), &options)
            .await
            .unwrap();
        assert_eq!(converter.max_active_dirs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_named_files_into_one_output_dir_do_not_clobber() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        let names: Vec<String> = (0..16).map(|d| format!("d{d:02}/ep.srt")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_files(&source, &refs);
        let out = dir.path().join("out");

        let mut options = BatchOptions::default();
        options.batch.output_dir = Some(out.clone());
        options.batch.directory_concurrency = 16;
        options.common.line_endings = crate::normalize::LineEnding::Lf;

        let scheduler = BatchScheduler::new(Arc::new(SubtitleConverter), Arc::new(NoProgress));
        let stats = scheduler
            .process_batch(&pattern(&source, "*/*.srt"), &options)
            .await
            .unwrap();

        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 15);
        assert!(stats.is_consistent());
        assert!(
            stats
                .errors
                .iter()
                .all(|failure| failure.error.contains("already exists"))
        );
        let on_disk: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(on_disk, vec!["ep.subnorm.srt".to_string()]);
    }

    #[tokio::test]
    async fn unreadable_destination_counts_as_absent() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("plain.srt");
        std::fs::write(&file, "x").unwrap();
        assert!(output_exists(&file).await);
        assert!(!output_exists(&dir.path().join("missing.srt")).await);
        assert!(!output_exists(&file.join("child.srt")).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn counts_stay_exact_under_concurrency() {
        let dir = tempdir().unwrap();
        let mut names = Vec::new();
        for d in 0..6 {
            for f in 0..9 {
                let stem = if f % 4 == 0 { "bad" } else { "f" };
                names.push(format!("d{d}/{stem}{f}.srt"));
            }
        }
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        write_files(dir.path(), &refs);
        std::fs::write(dir.path().join("d0/f1.subnorm.srt"), "done").unwrap();

        let progress = Arc::new(RecordingProgress::default());
        let scheduler = BatchScheduler::new(
            Arc::new(ScriptedConverter {
                failing: vec!["bad"],
                delay: Duration::from_millis(1),
                ..Default::default()
            }),
            progress.clone(),
        );
        let mut options = BatchOptions::default();
        options.batch.skip_existing = true;
        options.batch.chunk_size = 4;

        let stats = scheduler
            .process_batch(&pattern(dir.path(), "*/{f,bad}[0-9].srt"), &options)
            .await
            .unwrap();

        assert_eq!(stats.total, 54);
        assert_eq!(stats.failed, 18);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.successful, 35);
        assert!(stats.is_consistent());
        assert_eq!(stats.directories_processed, 6);
        assert_eq!(progress.files.load(Ordering::SeqCst), 54);
        assert_eq!(progress.directories.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn end_to_end_with_output_directory() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("src");
        std::fs::create_dir_all(source.join("s1")).unwrap();
        std::fs::write(
            source.join("s1/ep1.srt"),
            "1\r\n00:00:01,000 --> 00:00:02,000\r\n<b>Hi</b>\r\n\r\n\r\nthere\r\n",
        )
        .unwrap();
        let out = dir.path().join("out");

        let mut options = BatchOptions::default();
        options.batch.recursive = true;
        options.batch.preserve_structure = true;
        options.batch.output_dir = Some(out.clone());
        options.common.line_endings = crate::normalize::LineEnding::Lf;
        options.common.strip = Some(crate::strip::StripOptions {
            html: true,
            ..Default::default()
        });

        let scheduler = BatchScheduler::new(Arc::new(SubtitleConverter), Arc::new(NoProgress));
        let stats = scheduler
            .process_batch(&pattern(&source, "*.srt"), &options)
            .await
            .unwrap();

        assert_eq!(stats.successful, 1);
        let written = std::fs::read_to_string(out.join("s1/ep1.subnorm.srt")).unwrap();
        assert_eq!(written, "1\n00:00:01,000 --> 00:00:02,000\nHi\nthere\n");
    }
}
