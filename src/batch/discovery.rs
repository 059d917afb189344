//! Source file discovery
//!
//! Recursively walks the root and collects every regular file whose name ends
//! with the configured suffix. Directory symlinks are not followed.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::{BatchError, BatchResult};

/// Discover all files under `root` whose file name ends with `suffix`.
///
/// The result is sorted so repeated runs print in the same order; callers must
/// not rely on any particular ordering beyond that.
pub fn discover_files(root: &Path, suffix: &str) -> BatchResult<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(BatchError::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    walk(root, suffix, &mut files)?;
    files.sort();

    tracing::debug!(root = %root.display(), suffix, count = files.len(), "discovered source files");
    Ok(files)
}

fn walk(dir: &Path, suffix: &str, files: &mut Vec<PathBuf>) -> BatchResult<()> {
    let entries = fs::read_dir(dir).map_err(|source| BatchError::Discovery {
        path: dir.to_path_buf(),
        source,
    })?;

    for entry in entries {
        let entry = entry.map_err(|source| BatchError::Discovery {
            path: dir.to_path_buf(),
            source,
        })?;
        let entry_path = entry.path();
        let file_type = entry.file_type().map_err(|source| BatchError::Discovery {
            path: entry_path.clone(),
            source,
        })?;

        if file_type.is_dir() {
            walk(&entry_path, suffix, files)?;
        } else if matches_suffix(&entry_path, suffix) && (file_type.is_file() || entry_path.is_file()) {
            files.push(entry_path);
        }
    }

    Ok(())
}

/// Whether the path's file name ends with `suffix`
pub fn matches_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name().is_some_and(|name| strip_name_suffix(name, suffix).is_some())
}

/// `name` without `suffix`, compared byte-for-byte so non-UTF-8 names keep their identity.
#[cfg(unix)]
pub fn strip_name_suffix<'a>(name: &'a OsStr, suffix: &str) -> Option<&'a OsStr> {
    use std::os::unix::ffi::OsStrExt;

    name.as_bytes().strip_suffix(suffix.as_bytes()).map(OsStr::from_bytes)
}

/// `name` without `suffix`. Names that are not valid Unicode never match.
#[cfg(not(unix))]
pub fn strip_name_suffix<'a>(name: &'a OsStr, suffix: &str) -> Option<&'a OsStr> {
    name.to_str()?.strip_suffix(suffix).map(OsStr::new)
}
