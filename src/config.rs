use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::normalize::LineEnding;
use crate::output::DEFAULT_MARKER;
use crate::strip::StripOptions;

pub const DEFAULT_CHUNK_SIZE: usize = 5;
pub const DEFAULT_DIRECTORY_CONCURRENCY: usize = 3;
pub const MAX_RETRY_COUNT: u32 = 10;

/// Per-run options of a single conversion.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub strip: Option<StripOptions>,
    pub backup_original: bool,
    pub overwrite_input: bool,
    pub overwrite_existing: bool,
    pub bom: bool,
    pub line_endings: LineEnding,
    pub encoding: Option<String>,
    pub marker: String,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub fail_fast: bool,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            strip: None,
            backup_original: false,
            overwrite_input: false,
            overwrite_existing: false,
            bom: false,
            line_endings: LineEnding::Auto,
            encoding: None,
            marker: DEFAULT_MARKER.to_string(),
            retry_count: 0,
            retry_delay: Duration::ZERO,
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub recursive: bool,
    pub parallel: bool,
    pub skip_existing: bool,
    pub max_depth: Option<usize>,
    pub include_directories: Vec<String>,
    pub exclude_directories: Vec<String>,
    pub preserve_structure: bool,
    pub chunk_size: usize,
    pub directory_concurrency: usize,
    pub output_dir: Option<PathBuf>,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            recursive: false,
            parallel: true,
            skip_existing: false,
            max_depth: None,
            include_directories: Vec::new(),
            exclude_directories: Vec::new(),
            preserve_structure: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            directory_concurrency: DEFAULT_DIRECTORY_CONCURRENCY,
            output_dir: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub common: ConversionOptions,
    pub batch: BatchSettings,
}

/// Settings file layout. Every field is optional and falls back to the
/// built-in default.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct Settings {
    pub input: InputSection,
    pub output: OutputSection,
    pub strip: StripOptions,
    pub batch: BatchSection,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct InputSection {
    pub encoding: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputSection {
    pub directory: Option<PathBuf>,
    pub marker: String,
    pub bom: bool,
    pub line_endings: LineEnding,
    pub overwrite_input: bool,
    pub overwrite_existing: bool,
    pub backup_original: bool,
    pub preserve_structure: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            directory: None,
            marker: DEFAULT_MARKER.to_string(),
            bom: false,
            line_endings: LineEnding::Auto,
            overwrite_input: false,
            overwrite_existing: false,
            backup_original: false,
            preserve_structure: false,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BatchSection {
    pub recursive: bool,
    pub parallel: bool,
    pub skip_existing: bool,
    pub max_depth: Option<usize>,
    pub include_directories: Vec<String>,
    pub exclude_directories: Vec<String>,
    pub chunk_size: usize,
    pub directory_concurrency: usize,
    pub retry_count: u32,
    pub retry_delay_ms: u64,
    pub fail_fast: bool,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            recursive: false,
            parallel: true,
            skip_existing: false,
            max_depth: None,
            include_directories: Vec::new(),
            exclude_directories: Vec::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            directory_concurrency: DEFAULT_DIRECTORY_CONCURRENCY,
            retry_count: 0,
            retry_delay_ms: 0,
            fail_fast: false,
        }
    }
}

impl Settings {
    /// Reads YAML, or JSON when the file has a `.json` extension.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("reading settings {}", path.display()))?;
        let settings = if path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false)
        {
            serde_json::from_slice(&data)
                .with_context(|| format!("parsing settings {}", path.display()))?
        } else {
            serde_yaml::from_slice(&data)
                .with_context(|| format!("parsing settings {}", path.display()))?
        };
        Ok(settings)
    }

    pub fn into_options(self) -> Result<BatchOptions> {
        let options = BatchOptions {
            common: ConversionOptions {
                strip: (!self.strip.is_empty()).then_some(self.strip),
                backup_original: self.output.backup_original,
                overwrite_input: self.output.overwrite_input,
                overwrite_existing: self.output.overwrite_existing,
                bom: self.output.bom,
                line_endings: self.output.line_endings,
                encoding: self.input.encoding,
                marker: self.output.marker,
                retry_count: self.batch.retry_count,
                retry_delay: Duration::from_millis(self.batch.retry_delay_ms),
                fail_fast: self.batch.fail_fast,
            },
            batch: BatchSettings {
                recursive: self.batch.recursive,
                parallel: self.batch.parallel,
                skip_existing: self.batch.skip_existing,
                max_depth: self.batch.max_depth,
                include_directories: self.batch.include_directories,
                exclude_directories: self.batch.exclude_directories,
                preserve_structure: self.output.preserve_structure,
                chunk_size: self.batch.chunk_size,
                directory_concurrency: self.batch.directory_concurrency,
                output_dir: self.output.directory,
            },
        };
        validate(&options)?;
        Ok(options)
    }
}

/// Values supplied per run by the command layer. Numeric values arrive as
/// text and are parsed here.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub encoding: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub marker: Option<String>,
    pub line_endings: Option<LineEnding>,
    pub strip: Option<StripOptions>,
    pub bom: bool,
    pub backup_original: bool,
    pub overwrite_input: bool,
    pub overwrite_existing: bool,
    pub recursive: bool,
    pub sequential: bool,
    pub skip_existing: bool,
    pub preserve_structure: bool,
    pub fail_fast: bool,
    pub include_directories: Vec<String>,
    pub exclude_directories: Vec<String>,
    pub retry_count: Option<String>,
    pub retry_delay: Option<String>,
    pub max_depth: Option<String>,
    pub chunk_size: Option<String>,
    pub directory_concurrency: Option<String>,
}

impl RunOverrides {
    pub fn apply(&self, options: &mut BatchOptions) -> Result<()> {
        let common = &mut options.common;
        let batch = &mut options.batch;

        if let Some(encoding) = &self.encoding {
            common.encoding = Some(encoding.clone());
        }
        if let Some(marker) = &self.marker {
            common.marker = marker.clone();
        }
        if let Some(line_endings) = self.line_endings {
            common.line_endings = line_endings;
        }
        if let Some(strip) = self.strip.filter(|strip| !strip.is_empty()) {
            common.strip = Some(strip);
        }
        common.bom |= self.bom;
        common.backup_original |= self.backup_original;
        common.overwrite_input |= self.overwrite_input;
        common.overwrite_existing |= self.overwrite_existing;
        common.fail_fast |= self.fail_fast;
        if let Some(value) = &self.retry_count {
            common.retry_count = parse_number("retry count", value)?;
        }
        if let Some(value) = &self.retry_delay {
            common.retry_delay = Duration::from_millis(parse_number("retry delay", value)?);
        }

        if let Some(dir) = &self.output_dir {
            batch.output_dir = Some(dir.clone());
        }
        batch.recursive |= self.recursive;
        batch.skip_existing |= self.skip_existing;
        batch.preserve_structure |= self.preserve_structure;
        if self.sequential {
            batch.parallel = false;
        }
        batch
            .include_directories
            .extend(self.include_directories.iter().cloned());
        batch
            .exclude_directories
            .extend(self.exclude_directories.iter().cloned());
        if let Some(value) = &self.max_depth {
            batch.max_depth = Some(parse_number("max depth", value)?);
        }
        if let Some(value) = &self.chunk_size {
            batch.chunk_size = parse_number("chunk size", value)?;
        }
        if let Some(value) = &self.directory_concurrency {
            batch.directory_concurrency = parse_number("directory concurrency", value)?;
        }

        validate(options)
    }
}

fn parse_number<T: std::str::FromStr>(what: &str, value: &str) -> Result<T> {
    let trimmed = value.trim();
    trimmed
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("invalid {what} '{trimmed}': expected a non-negative integer"))
}

fn validate(options: &BatchOptions) -> Result<()> {
    if options.batch.chunk_size == 0 {
        bail!("chunk size must be at least 1");
    }
    if options.batch.directory_concurrency == 0 {
        bail!("directory concurrency must be at least 1");
    }
    if options.common.retry_count > MAX_RETRY_COUNT {
        bail!(
            "retry count {} exceeds the maximum of {MAX_RETRY_COUNT}",
            options.common.retry_count
        );
    }
    if options.common.marker.trim().is_empty() {
        bail!("output marker must not be empty");
    }
    Ok(())
}
