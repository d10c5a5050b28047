use std::path::{Path, PathBuf};

use crate::config::BatchOptions;

pub const DEFAULT_MARKER: &str = "subnorm";

/// Where a conversion writes and whether it must back the input up first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputStrategy {
    /// `name.<marker>.ext` next to the input.
    Suffix { marker: String },
    /// The input itself; always backed up before the destructive write.
    Overwrite,
}

impl OutputStrategy {
    pub fn select(overwrite_input: bool, marker: &str) -> Self {
        if overwrite_input {
            OutputStrategy::Overwrite
        } else {
            OutputStrategy::Suffix {
                marker: marker.to_string(),
            }
        }
    }

    pub fn output_path(&self, input: &Path) -> PathBuf {
        match self {
            OutputStrategy::Overwrite => input.to_path_buf(),
            OutputStrategy::Suffix { marker } => {
                let stem = input
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let name = match input.extension() {
                    Some(ext) => format!("{stem}.{marker}.{}", ext.to_string_lossy()),
                    None => format!("{stem}.{marker}"),
                };
                input.with_file_name(name)
            }
        }
    }

    pub fn should_backup(&self) -> bool {
        matches!(self, OutputStrategy::Overwrite)
    }
}

/// Output directory for files found in `source_dir`, mirroring the layout
/// below the pattern base when `preserve_structure` is set.
pub fn mirrored_directory(
    source_dir: &Path,
    base: &Path,
    output_dir: &Path,
    preserve_structure: bool,
) -> PathBuf {
    if !preserve_structure {
        return output_dir.to_path_buf();
    }
    match source_dir.strip_prefix(base) {
        Ok(relative) => output_dir.join(relative),
        Err(_) => output_dir.to_path_buf(),
    }
}

/// Destination of `input` within a batch. The overwrite strategy always
/// targets the input, so an output directory only applies to suffixed files.
pub fn batch_destination(input: &Path, base: &Path, options: &BatchOptions) -> PathBuf {
    let strategy =
        OutputStrategy::select(options.common.overwrite_input, &options.common.marker);
    let default = strategy.output_path(input);

    let Some(output_dir) = options.batch.output_dir.as_deref() else {
        return default;
    };
    if strategy.should_backup() {
        return default;
    }
    let Some(file_name) = default.file_name() else {
        return default;
    };
    let source_dir = input.parent().unwrap_or_else(|| Path::new(""));
    mirrored_directory(
        source_dir,
        base,
        output_dir,
        options.batch.preserve_structure,
    )
    .join(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_inserts_marker_before_extension() {
        let strategy = OutputStrategy::select(false, "clean");
        let input = Path::new("/subs/movie.en.srt");
        let output = strategy.output_path(input);
        assert_eq!(output, PathBuf::from("/subs/movie.en.clean.srt"));
        assert_ne!(output, input);
        assert!(!strategy.should_backup());
    }

    #[test]
    fn suffix_without_extension() {
        let strategy = OutputStrategy::select(false, DEFAULT_MARKER);
        assert_eq!(
            strategy.output_path(Path::new("notes")),
            PathBuf::from("notes.subnorm")
        );
    }

    #[test]
    fn overwrite_targets_input_and_requires_backup() {
        let strategy = OutputStrategy::select(true, DEFAULT_MARKER);
        assert_eq!(
            strategy.output_path(Path::new("a/b.srt")),
            PathBuf::from("a/b.srt")
        );
        assert!(strategy.should_backup());
    }

    #[test]
    fn batch_destination_honours_output_dir() {
        let mut options = BatchOptions::default();
        options.batch.output_dir = Some(PathBuf::from("/out"));
        let input = Path::new("/in/season1/ep1.srt");

        assert_eq!(
            batch_destination(input, Path::new("/in"), &options),
            PathBuf::from("/out/ep1.subnorm.srt")
        );

        options.batch.preserve_structure = true;
        assert_eq!(
            batch_destination(input, Path::new("/in"), &options),
            PathBuf::from("/out/season1/ep1.subnorm.srt")
        );

        options.common.overwrite_input = true;
        assert_eq!(batch_destination(input, Path::new("/in"), &options), input);
    }
}
