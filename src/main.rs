use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};
use serde_json::json;
use tracing::{debug, error};

use subnorm::logging::{self, DEFAULT_RUN_LOG};
use subnorm::normalize::LineEnding;
use subnorm::{
    BatchError, BatchOptions, BatchScheduler, BatchStats, FileConverter, FileOutcome,
    RunOverrides, Settings, StripOptions, SubtitleConverter, TracingProgress,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing(cli.verbose)?;
    run(cli).await
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Convert(cmd) => handle_convert(cmd).await,
        Command::Batch(cmd) => handle_batch(cmd).await,
        Command::Log(cmd) => handle_log(cmd),
    }
}

async fn handle_convert(cmd: ConvertCommand) -> Result<()> {
    let options = cmd.common.resolve_options()?;
    let started = Instant::now();
    let result = SubtitleConverter
        .process_file(&cmd.input, cmd.output.as_deref(), &options.common)
        .await;

    let mut stats = BatchStats::started_now();
    let dir = cmd.input.parent().unwrap_or(Path::new("."));
    stats.register_directory(dir, 1);
    let outcome = match &result {
        Ok(_) => FileOutcome::Succeeded { attempts: 1 },
        Err(err) => FileOutcome::Failed {
            attempts: 1,
            error: err.to_string(),
        },
    };
    stats.record(dir, &cmd.input, &outcome);
    stats.directories_processed = 1;
    stats.finish(started.elapsed());
    cmd.common
        .record_run("convert", &cmd.input.display().to_string(), &stats)?;

    match result {
        Ok(converted) => {
            if cmd.common.json {
                let payload = json!({
                    "input": cmd.input,
                    "output": converted.output_path,
                    "backup": converted.backup_path,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!(
                    "{} -> {}",
                    cmd.input.display(),
                    converted.output_path.display()
                );
                if let Some(backup) = converted.backup_path {
                    println!("backup: {}", backup.display());
                }
            }
            Ok(())
        }
        Err(err) => {
            debug!("conversion failed ({:?})", err.kind());
            Err(err).with_context(|| format!("converting {}", cmd.input.display()))
        }
    }
}

async fn handle_batch(cmd: BatchCommand) -> Result<()> {
    let options = cmd.common.resolve_options()?;
    let scheduler = BatchScheduler::new(Arc::new(SubtitleConverter), Arc::new(TracingProgress));

    match scheduler.process_batch(&cmd.pattern, &options).await {
        Ok(stats) => {
            cmd.common.record_run("batch", &cmd.pattern, &stats)?;
            print_stats(&stats, cmd.common.json)?;
            if stats.failed > 0 {
                bail!("{} of {} files failed", stats.failed, stats.total);
            }
            Ok(())
        }
        Err(BatchError::Aborted {
            file,
            message,
            stats,
        }) => {
            cmd.common.record_run("batch", &cmd.pattern, &stats)?;
            print_stats(&stats, cmd.common.json)?;
            error!("stopping after first failure (fail-fast)");
            bail!("batch aborted at {}: {message}", file.display());
        }
        Err(err) => Err(err).with_context(|| format!("processing batch '{}'", cmd.pattern)),
    }
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let path = cmd.run_log.unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_LOG));
    let entries = logging::read_recent(&path, cmd.tail)?;
    if entries.is_empty() {
        println!("run log is empty.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "[{}] {:<8} ok={:<5} failed={:<5} skipped={:<5} {:>7}ms  {}",
            entry.timestamp,
            entry.command,
            entry.successful,
            entry.failed,
            entry.skipped,
            entry.time_taken_ms,
            entry.target
        );
    }
    Ok(())
}

fn print_stats(stats: &BatchStats, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(stats)?);
        return Ok(());
    }
    println!(
        "{} files: {} converted, {} failed, {} skipped in {}ms ({:.1}ms/file)",
        stats.total,
        stats.successful,
        stats.failed,
        stats.skipped,
        stats.time_taken_ms,
        stats.average_time_per_file_ms
    );
    for failure in &stats.errors {
        println!("  failed: {}: {}", failure.file.display(), failure.error);
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StripPass {
    Html,
    Colors,
    Styles,
    Urls,
    Timestamps,
    Numbers,
    Punctuation,
    Emojis,
    Brackets,
    All,
}

fn strip_options(passes: &[StripPass]) -> StripOptions {
    let mut options = StripOptions::default();
    for pass in passes {
        match pass {
            StripPass::Html => options.html = true,
            StripPass::Colors => options.colors = true,
            StripPass::Styles => options.styles = true,
            StripPass::Urls => options.urls = true,
            StripPass::Timestamps => options.timestamps = true,
            StripPass::Numbers => options.numbers = true,
            StripPass::Punctuation => options.punctuation = true,
            StripPass::Emojis => options.emojis = true,
            StripPass::Brackets => options.brackets = true,
            StripPass::All => options = StripOptions::all(),
        }
    }
    options
}

#[derive(Debug, Parser)]
#[command(name = "subnorm", version, about = "Subtitle encoding and formatting normaliser")]
struct Cli {
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert a single subtitle file.
    Convert(ConvertCommand),
    /// Convert every file matched by a glob pattern.
    Batch(BatchCommand),
    /// Show recent runs from the run log.
    Log(LogCommand),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<String>,
    #[arg(long, value_name = "MARKER")]
    marker: Option<String>,
    #[arg(long = "line-endings", value_name = "auto|lf|crlf")]
    line_endings: Option<LineEnding>,
    #[arg(long = "strip", value_enum, value_delimiter = ',')]
    strip: Vec<StripPass>,
    #[arg(long, action = ArgAction::SetTrue)]
    bom: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    backup: bool,
    #[arg(long = "overwrite-input", action = ArgAction::SetTrue)]
    overwrite_input: bool,
    #[arg(long = "overwrite-existing", action = ArgAction::SetTrue)]
    overwrite_existing: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
    #[arg(long = "run-log", value_name = "FILE", value_hint = ValueHint::FilePath)]
    run_log: Option<PathBuf>,
    #[command(flatten)]
    batch: BatchArgs,
}

#[derive(Debug, Clone, Default, Args)]
struct BatchArgs {
    #[arg(long = "output-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    output_dir: Option<PathBuf>,
    #[arg(short, long, action = ArgAction::SetTrue)]
    recursive: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    sequential: bool,
    #[arg(long = "skip-existing", action = ArgAction::SetTrue)]
    skip_existing: bool,
    #[arg(long = "preserve-structure", action = ArgAction::SetTrue)]
    preserve_structure: bool,
    #[arg(long = "fail-fast", action = ArgAction::SetTrue)]
    fail_fast: bool,
    #[arg(long = "include-dir", value_name = "SUBSTRING")]
    include_directories: Vec<String>,
    #[arg(long = "exclude-dir", value_name = "SUBSTRING")]
    exclude_directories: Vec<String>,
    #[arg(long = "retry-count", value_name = "N")]
    retry_count: Option<String>,
    #[arg(long = "retry-delay", value_name = "MS")]
    retry_delay: Option<String>,
    #[arg(long = "max-depth", value_name = "N")]
    max_depth: Option<String>,
    #[arg(long = "chunk-size", value_name = "N")]
    chunk_size: Option<String>,
    #[arg(long = "directory-concurrency", value_name = "N")]
    directory_concurrency: Option<String>,
}

impl CommonArgs {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            encoding: self.encoding.clone(),
            output_dir: self.batch.output_dir.clone(),
            marker: self.marker.clone(),
            line_endings: self.line_endings,
            strip: (!self.strip.is_empty()).then(|| strip_options(&self.strip)),
            bom: self.bom,
            backup_original: self.backup,
            overwrite_input: self.overwrite_input,
            overwrite_existing: self.overwrite_existing,
            recursive: self.batch.recursive,
            sequential: self.batch.sequential,
            skip_existing: self.batch.skip_existing,
            preserve_structure: self.batch.preserve_structure,
            fail_fast: self.batch.fail_fast,
            include_directories: self.batch.include_directories.clone(),
            exclude_directories: self.batch.exclude_directories.clone(),
            retry_count: self.batch.retry_count.clone(),
            retry_delay: self.batch.retry_delay.clone(),
            max_depth: self.batch.max_depth.clone(),
            chunk_size: self.batch.chunk_size.clone(),
            directory_concurrency: self.batch.directory_concurrency.clone(),
        }
    }

    fn resolve_options(&self) -> Result<BatchOptions> {
        let mut options = match &self.config {
            Some(path) => Settings::load(path)?.into_options()?,
            None => BatchOptions::default(),
        };
        self.overrides().apply(&mut options)?;
        Ok(options)
    }

    fn record_run(&self, command: &str, target: &str, stats: &BatchStats) -> Result<()> {
        match &self.run_log {
            Some(path) => logging::record_run(path, command, target, stats),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Args)]
struct ConvertCommand {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[arg(short, long, value_name = "OUTPUT", value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BatchCommand {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(value_name = "PATTERN")]
    pattern: String,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long = "tail", default_value_t = 20)]
    tail: usize,
    #[arg(long = "run-log", value_name = "FILE", value_hint = ValueHint::FilePath)]
    run_log: Option<PathBuf>,
}
