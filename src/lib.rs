//! Subtitle normalisation: charset detection, transcoding to UTF-8,
//! formatting cleanup, block re-flow and line-ending control, for single
//! files or whole directory trees.

pub mod backup;
pub mod batch;
pub mod config;
pub mod convert;
pub mod encoding;
pub mod error;
pub mod files;
pub mod logging;
pub mod normalize;
pub mod output;
pub mod progress;
pub mod stats;
pub mod strip;

pub use batch::BatchScheduler;
pub use config::{BatchOptions, BatchSettings, ConversionOptions, RunOverrides, Settings};
pub use convert::{ConversionResult, FileConverter, SubtitleConverter};
pub use error::{BatchError, ConvertError, ErrorKind};
pub use output::OutputStrategy;
pub use progress::{NoProgress, ProgressSink, TracingProgress};
pub use stats::{BatchStats, DirectoryStats, FileError, FileOutcome};
pub use strip::StripOptions;
