use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};

/// Copies `path` to the first free `<path>.bak`, `<path>.bak.1`, ... slot.
/// Slots are claimed with `create_new`, so an existing backup is never
/// overwritten, even by a concurrent caller.
pub async fn create_backup(path: &Path) -> io::Result<PathBuf> {
    let mut attempt = 0usize;
    loop {
        let candidate = backup_candidate(path, attempt);
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&candidate)
            .await
        {
            Ok(mut target) => {
                let copied = copy_into(path, &mut target).await;
                drop(target);
                if let Err(err) = copied {
                    let _ = fs::remove_file(&candidate).await;
                    return Err(err);
                }
                return Ok(candidate);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(err) => return Err(err),
        }
    }
}

async fn copy_into(source: &Path, target: &mut fs::File) -> io::Result<()> {
    let mut source = fs::File::open(source).await?;
    tokio::io::copy(&mut source, target).await?;
    target.sync_all().await
}

/// Puts the backed-up bytes back over `original` and removes the backup.
pub async fn restore_backup(backup: &Path, original: &Path) -> io::Result<()> {
    fs::copy(backup, original).await?;
    fs::remove_file(backup).await
}

fn backup_candidate(path: &Path, index: usize) -> PathBuf {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "subnorm_file".to_string());
    let suffix = if index == 0 {
        ".bak".to_string()
    } else {
        format!(".bak.{index}")
    };
    path.with_file_name(format!("{name}{suffix}"))
}
