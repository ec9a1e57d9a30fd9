//! Directory listing for watched media folders
//!
//! A section's listing is the full non-recursive set of plain files in
//! its directory, sorted lexicographically by path. Re-listing on every
//! change notification is the model's contract - no incremental diffing.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors from reading a watched directory
#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read directory {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// List the plain files directly under `path`, sorted ascending by
/// full path string. Subdirectories and anything unreadable mid-scan
/// are skipped.
pub fn read_directory(path: &Path) -> Result<Vec<PathBuf>, ListingError> {
    if !path.is_dir() {
        return Err(ListingError::NotADirectory(path.to_path_buf()));
    }

    let entries = fs::read_dir(path).map_err(|e| ListingError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut items: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();

    items.sort();
    Ok(items)
}

/// Display label for an item button: basename with the extension
/// stripped ("/clips/intro loop.mp4" -> "intro loop").
pub fn display_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}
