//! Entry classification and size probing.
//!
//! Pure and read-only: nothing here mutates the filesystem.

use crate::utils;
use serde::Serialize;
use std::io;
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
}

/// What a probe found at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub kind: EntryKind,
    /// File length, or the best-effort recursive sum for directories.
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    /// The path vanished, usually because another process removed it between
    /// listing and probing. Callers treat this as "nothing to do".
    #[error("path not found: {0}")]
    NotFound(String),
    #[error("failed to read metadata for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Classify `path` and compute its reclaimable size.
///
/// Symlinks are never followed: a link counts as a file of its own length.
pub fn probe(path: &Path) -> Result<Probe, ProbeError> {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ProbeError::NotFound(path.display().to_string()))
        }
        Err(source) => {
            return Err(ProbeError::Io {
                path: path.display().to_string(),
                source,
            })
        }
    };

    if is_directory_link(path, &meta) {
        // Junction or directory symlink: deleting it removes the link only.
        Ok(Probe {
            kind: EntryKind::Directory,
            size: 0,
        })
    } else if meta.is_dir() {
        Ok(Probe {
            kind: EntryKind::Directory,
            size: directory_size(path),
        })
    } else {
        Ok(Probe {
            kind: EntryKind::File,
            size: meta.len(),
        })
    }
}

/// Windows reports junctions and directory symlinks as symlinks, not
/// directories, yet they must be removed with `remove_dir`.
#[cfg(windows)]
fn is_directory_link(path: &Path, meta: &std::fs::Metadata) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_DIRECTORY: u32 = 0x0010;
    utils::is_windows_reparse_point(path) && meta.file_attributes() & FILE_ATTRIBUTE_DIRECTORY != 0
}

/// Unix directory symlinks unlink like files.
#[cfg(not(windows))]
fn is_directory_link(_path: &Path, _meta: &std::fs::Metadata) -> bool {
    false
}

/// Sum of all file lengths under `path`. Unreadable entries are skipped.
pub fn directory_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !utils::is_windows_reparse_point(entry.path()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
