use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::{DirEntry, WalkDir};

use crate::config::BatchSettings;
use crate::error::BatchError;

const GLOB_META: &[char] = &['*', '?', '[', '{'];

#[derive(Debug, Clone)]
pub struct Discovery {
    /// Literal directory prefix of the pattern; structure is mirrored
    /// relative to it.
    pub base: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub directory: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Expands `pattern` into candidate files.
///
/// Without `recursive`, wildcards stay within one path segment and the walk
/// goes no deeper than the pattern itself. With `recursive`, `*` also
/// crosses directories and `max_depth` (subdirectory levels below the base)
/// bounds the walk.
pub fn discover(pattern: &str, settings: &BatchSettings) -> Result<Discovery, BatchError> {
    let (base, remainder) = split_pattern(pattern);

    if remainder.is_empty() {
        let files = if base.is_file() {
            vec![base.clone()]
        } else if base.is_dir() {
            walk_matches(&base, "*", pattern, settings)?
        } else {
            Vec::new()
        };
        return Ok(finish(base, files, settings));
    }

    if !base.is_dir() {
        return Ok(Discovery {
            base,
            files: Vec::new(),
        });
    }

    let files = walk_matches(&base, &remainder, pattern, settings)?;
    Ok(finish(base, files, settings))
}

pub fn group_by_directory(files: &[PathBuf]) -> Vec<DirectoryGroup> {
    let mut groups: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for file in files {
        let directory = file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        groups.entry(directory).or_default().push(file.clone());
    }
    groups
        .into_iter()
        .map(|(directory, files)| DirectoryGroup { directory, files })
        .collect()
}

fn split_pattern(pattern: &str) -> (PathBuf, String) {
    let mut base = PathBuf::new();
    let mut rest: Vec<String> = Vec::new();
    for component in Path::new(pattern).components() {
        let text = component.as_os_str().to_string_lossy();
        let is_literal = rest.is_empty()
            && (!matches!(component, Component::Normal(_)) || !text.contains(GLOB_META));
        if is_literal {
            base.push(component.as_os_str());
        } else {
            rest.push(text.into_owned());
        }
    }
    if base.as_os_str().is_empty() {
        base.push(".");
    }
    (base, rest.join("/"))
}

fn walk_matches(
    base: &Path,
    remainder: &str,
    pattern: &str,
    settings: &BatchSettings,
) -> Result<Vec<PathBuf>, BatchError> {
    let matcher = build_matcher(remainder, pattern, settings.recursive)?;
    let segments = remainder.split('/').count();
    let depth_limit = if settings.recursive {
        settings.max_depth.map(|depth| depth + 1)
    } else {
        Some(segments)
    };

    let mut walker = WalkDir::new(base).min_depth(1).follow_links(false);
    if let Some(limit) = depth_limit {
        walker = walker.max_depth(limit);
    }

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|entry| !is_hidden(entry)) {
        let entry = entry.map_err(|source| BatchError::Discovery {
            root: base.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let Ok(relative) = path.strip_prefix(base) else {
            continue;
        };
        if matcher.is_match(normalize_slashes(relative).as_str()) {
            files.push(path);
        }
    }
    Ok(files)
}

fn build_matcher(remainder: &str, pattern: &str, recursive: bool) -> Result<GlobMatcher, BatchError> {
    GlobBuilder::new(remainder)
        .literal_separator(!recursive)
        .build()
        .map(|glob| glob.compile_matcher())
        .map_err(|err| BatchError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })
}

fn finish(base: PathBuf, mut files: Vec<PathBuf>, settings: &BatchSettings) -> Discovery {
    files.retain(|file| passes_directory_filters(file, settings));
    files.sort();
    files.dedup();
    Discovery { base, files }
}

fn passes_directory_filters(file: &Path, settings: &BatchSettings) -> bool {
    let directory = file.parent().map(normalize_slashes).unwrap_or_default();
    let included = settings.include_directories.is_empty()
        || settings
            .include_directories
            .iter()
            .any(|needle| directory.contains(needle.as_str()));
    let excluded = settings
        .exclude_directories
        .iter()
        .any(|needle| directory.contains(needle.as_str()));
    included && !excluded
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn normalize_slashes(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
