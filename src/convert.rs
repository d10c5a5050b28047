use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::backup::{create_backup, restore_backup};
use crate::config::ConversionOptions;
use crate::encoding::{decode, detect_charset};
use crate::error::ConvertError;
use crate::normalize::{encode_output, normalize_line_endings, reflow_blocks};
use crate::output::OutputStrategy;
use crate::strip::strip_formatting;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    pub output_path: PathBuf,
    pub backup_path: Option<PathBuf>,
}

/// Converts exactly one file. The batch scheduler only talks to this seam.
#[async_trait]
pub trait FileConverter: Send + Sync {
    async fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, ConvertError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SubtitleConverter;

#[async_trait]
impl FileConverter for SubtitleConverter {
    async fn process_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        options: &ConversionOptions,
    ) -> Result<ConversionResult, ConvertError> {
        convert_file(input, output, options, |backup, original| async move {
            restore_backup(&backup, &original).await
        })
        .await
    }
}

/// Full single-file flow. `restore` puts a backup back over the input when
/// an in-place conversion fails.
async fn convert_file<R, Fut>(
    input: &Path,
    output: Option<&Path>,
    options: &ConversionOptions,
    restore: R,
) -> Result<ConversionResult, ConvertError>
where
    R: FnOnce(PathBuf, PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if !path_exists(input).await? {
        return Err(ConvertError::InputNotFound {
            path: input.to_path_buf(),
        });
    }

    let strategy = OutputStrategy::select(options.overwrite_input, &options.marker);
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| strategy.output_path(input));

    let backup_path = if strategy.should_backup() || options.backup_original {
        let backup = create_backup(input)
            .await
            .map_err(|err| ConvertError::io(format!("backing up {}", input.display()), err))?;
        debug!("backup saved: {} -> {}", input.display(), backup.display());
        Some(backup)
    } else {
        None
    };

    match convert_contents(input, &output_path, &strategy, options).await {
        Ok(()) => Ok(ConversionResult {
            output_path,
            backup_path,
        }),
        Err(err) => match backup_path {
            Some(backup) if strategy.should_backup() => {
                Err(recover_from_backup(err, backup, input, restore).await)
            }
            _ => Err(err),
        },
    }
}

async fn convert_contents(
    input: &Path,
    output_path: &Path,
    strategy: &OutputStrategy,
    options: &ConversionOptions,
) -> Result<(), ConvertError> {
    let replaces_input = strategy.should_backup() && output_path == input;
    let replace = options.overwrite_existing || replaces_input;
    if !replace && path_exists(output_path).await? {
        return Err(ConvertError::OutputExists {
            path: output_path.to_path_buf(),
        });
    }

    let bytes = fs::read(input)
        .await
        .map_err(|err| ConvertError::io(format!("reading {}", input.display()), err))?;
    let charset = match options.encoding.as_deref() {
        Some(label) => label.to_string(),
        None => {
            let detection = detect_charset(&bytes);
            debug!(
                "{}: detected {} ({})",
                input.display(),
                detection.name(),
                detection.source
            );
            detection.name()
        }
    };
    let decoded = decode(&bytes, &charset)?;
    if decoded.had_errors {
        warn!(
            "decoding errors encountered for {} as {}; continuing",
            input.display(),
            decoded.encoding.name()
        );
    }

    let mut text = decoded.text;
    if let Some(strip) = &options.strip {
        text = strip_formatting(&text, strip);
    }
    let text = reflow_blocks(&text);
    let text = normalize_line_endings(&text, options.line_endings);
    let data = encode_output(&text, options.bom);

    write_via_temp(output_path, &data, replace).await
}

async fn recover_from_backup<R, Fut>(
    err: ConvertError,
    backup: PathBuf,
    input: &Path,
    restore: R,
) -> ConvertError
where
    R: FnOnce(PathBuf, PathBuf) -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    match restore(backup.clone(), input.to_path_buf()).await {
        Ok(()) => {
            warn!(
                "restored {} from {} after failure: {err}",
                input.display(),
                backup.display()
            );
            err
        }
        Err(restore) => ConvertError::RestoreFailed {
            original: Box::new(err),
            backup,
            restore,
        },
    }
}

async fn path_exists(path: &Path) -> Result<bool, ConvertError> {
    fs::try_exists(path)
        .await
        .map_err(|err| ConvertError::io(format!("checking {}", path.display()), err))
}

/// Writes `data` to a sibling temp file, then publishes it at `path`.
/// Without `replace` the publish step refuses an existing destination, so
/// concurrent writers racing for one path cannot clobber each other.
async fn write_via_temp(path: &Path, data: &[u8], replace: bool) -> Result<(), ConvertError> {
    let write_error = |err: io::Error| ConvertError::io(format!("writing {}", path.display()), err);

    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = parent {
        fs::create_dir_all(dir).await.map_err(write_error)?;
    }
    let base_dir = parent.unwrap_or_else(|| Path::new("."));
    let unique = format!(
        ".subnorm-tmp-{}-{}-{}",
        std::process::id(),
        OffsetDateTime::now_utc().unix_timestamp_nanos(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let temp_path = base_dir.join(unique);

    if let Err(err) = write_temp(&temp_path, data).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(write_error(err));
    }

    let published = if replace {
        fs::rename(&temp_path, path).await
    } else {
        fs::hard_link(&temp_path, path).await
    };
    let cleanup = if replace && published.is_ok() {
        Ok(())
    } else {
        fs::remove_file(&temp_path).await
    };

    match published {
        Ok(()) => {
            if let Err(err) = cleanup {
                warn!("could not remove temp file {}: {err}", temp_path.display());
            }
            Ok(())
        }
        Err(err) if !replace && err.kind() == io::ErrorKind::AlreadyExists => {
            Err(ConvertError::OutputExists {
                path: path.to_path_buf(),
            })
        }
        Err(err) => Err(write_error(err)),
    }
}

async fn write_temp(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(data).await?;
    file.sync_all().await
}
