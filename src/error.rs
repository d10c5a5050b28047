use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::stats::BatchStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InputNotFound,
    EncodingUnsupported,
    OutputExists,
    Io,
    RestoreFailure,
}

/// Failure of a single-file conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("unsupported encoding '{label}'")]
    EncodingUnsupported { label: String },

    #[error("output file already exists: {}", path.display())]
    OutputExists { path: PathBuf },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("{original}; restoring backup {} also failed: {restore}", backup.display())]
    RestoreFailed {
        original: Box<ConvertError>,
        backup: PathBuf,
        restore: io::Error,
    },
}

impl ConvertError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ConvertError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::InputNotFound { .. } => ErrorKind::InputNotFound,
            ConvertError::EncodingUnsupported { .. } => ErrorKind::EncodingUnsupported,
            ConvertError::OutputExists { .. } => ErrorKind::OutputExists,
            ConvertError::Io { .. } => ErrorKind::Io,
            ConvertError::RestoreFailed { .. } => ErrorKind::RestoreFailure,
        }
    }
}

/// Fatal batch-level failure. Per-file failures are recorded in the stats
/// instead, unless fail-fast turns one into [`BatchError::Aborted`].
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("error walking {}: {source}", root.display())]
    Discovery {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("creating output directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("batch aborted after {} failed: {message}", file.display())]
    Aborted {
        file: PathBuf,
        message: String,
        stats: Box<BatchStats>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_failure_mentions_both_causes() {
        let err = ConvertError::RestoreFailed {
            original: Box::new(ConvertError::io(
                "writing out.srt",
                io::Error::other("disk full"),
            )),
            backup: PathBuf::from("in.srt.bak"),
            restore: io::Error::other("permission denied"),
        };
        let message = err.to_string();
        assert!(message.contains("disk full"));
        assert!(message.contains("permission denied"));
        assert_eq!(err.kind(), ErrorKind::RestoreFailure);
    }
}
