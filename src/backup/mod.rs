//! Timed backups of partition documents
//!
//! Every tracked document is copied into
//! `backup_root/Category_<LETTER>/<stem>_<YYYYMMDD_HHMMSS>.json` when tracking
//! starts and then once per interval. Snapshots are made read-only and are
//! never overwritten.

mod scheduler;

pub use scheduler::BackupScheduler;

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while taking a snapshot
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Nothing to back up at {0}")]
    MissingSource(PathBuf),
}

/// Folder name for a document's snapshots
///
/// `harvest_b.json` belongs to `Category_B`; a stem without a one-letter
/// suffix goes to `Unknown`.
pub fn backup_folder_for(path: &Path) -> String {
    let letter = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.rsplit_once('_'))
        .map(|(_, suffix)| suffix)
        .filter(|suffix| suffix.len() == 1 && suffix.chars().all(|c| c.is_ascii_alphabetic()));

    match letter {
        Some(letter) => format!("Category_{}", letter.to_ascii_uppercase()),
        None => "Unknown".to_string(),
    }
}

/// Snapshot file name for `path` at `timestamp`, with an optional collision counter
pub fn snapshot_name(path: &Path, timestamp: &str, counter: u32) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "json".to_string());

    if counter == 0 {
        format!("{}_{}.{}", stem, timestamp, extension)
    } else {
        format!("{}_{}-{}.{}", stem, timestamp, counter, extension)
    }
}

/// Copies `path` into its partition folder under `root`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Path of the new read-only snapshot
/// * `Err(BackupError)` - The source is missing or the copy failed
pub fn create_snapshot(path: &Path, root: &Path) -> Result<PathBuf, BackupError> {
    if !path.is_file() {
        return Err(BackupError::MissingSource(path.to_path_buf()));
    }

    let folder = root.join(backup_folder_for(path));
    fs::create_dir_all(&folder)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let mut counter = 0;
    let mut destination = folder.join(snapshot_name(path, &timestamp, counter));
    while destination.exists() {
        counter += 1;
        destination = folder.join(snapshot_name(path, &timestamp, counter));
    }

    fs::copy(path, &destination)?;

    let mut permissions = fs::metadata(&destination)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&destination, permissions)?;

    Ok(destination)
}
