// ABOUTME: Utility functions for the beamer-slides application
// ABOUTME: Path validation, directory creation and output path derivation helpers

use crate::errors::{Result, SlidesError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

/// Validate that a path exists and is a regular file
pub fn validate_file_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(SlidesError::PathNotFoundError(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(SlidesError::ValidationError(format!(
            "Expected a file but found something else: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_directory_exists(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    if !path.exists() {
        fs::create_dir_all(path)?;
    } else if !path.is_dir() {
        return Err(SlidesError::ValidationError(format!(
            "Path exists but is not a directory: {:?}",
            path
        )));
    }
    Ok(())
}

/// Ensure a file's parent directory exists
pub fn ensure_parent_directory_exists(file_path: &Path) -> Result<()> {
    match file_path.parent() {
        Some(parent) => ensure_directory_exists(parent),
        None => Ok(()),
    }
}

/// Check that files can be created in a directory by writing a probe file
pub fn validate_directory_writable(path: &Path) -> Result<()> {
    ensure_directory_exists(path)?;

    let probe = path.join(format!(".write_probe_{}.tmp", uuid::Uuid::new_v4()));
    match fs::File::create(&probe) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&probe) {
                warn!("Failed to clean up probe file {:?}: {}", probe, e);
            }
            Ok(())
        }
        Err(e) => Err(SlidesError::ValidationError(format!(
            "Directory is not writable: {:?} - {}",
            path, e
        ))),
    }
}

/// Get the canonical absolute path
pub fn get_absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).map_err(|e| {
        SlidesError::ValidationError(format!("Failed to get absolute path for {:?}: {}", path, e))
    })
}

/// Whether the path has the given extension, ignoring case
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}
