//! Filesystem capabilities used by the retry engine.
//!
//! [`ReclaimOps`] is the seam between the delete-with-retry state machine and
//! the operating system. [`LocalOps`] talks to the real filesystem; tests swap
//! in fakes that report busy or protected entries on demand.

use super::lock;
use super::probe::{self, EntryKind, Probe, ProbeError};
use crate::utils;
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;
use walkdir::WalkDir;

pub trait ReclaimOps: Send + Sync {
    fn probe(&self, path: &Path) -> Result<Probe, ProbeError> {
        probe::probe(path)
    }

    /// Best-effort removal of a read-only attribute. Failures are ignored.
    fn clear_readonly(&self, path: &Path, kind: EntryKind);

    /// Unlink a file or recursively remove a directory.
    fn remove(&self, path: &Path, kind: EntryKind) -> io::Result<()>;

    fn is_locked(&self, path: &Path) -> bool {
        lock::is_locked(path)
    }

    /// Ask the OS to delete `path` at next restart. Returns `false` when the
    /// capability is missing or any part of the request was refused.
    fn schedule_delete_on_restart(&self, path: &Path, kind: EntryKind) -> bool;

    /// Backoff sleep. Blocks the calling worker.
    fn pause(&self, delay: Duration) {
        std::thread::sleep(delay);
    }
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalOps;

impl ReclaimOps for LocalOps {
    fn clear_readonly(&self, path: &Path, kind: EntryKind) {
        if kind == EntryKind::File || utils::is_windows_reparse_point(path) {
            clear_readonly_one(path);
            return;
        }
        // remove_dir_all on Windows stops at the first read-only file.
        for entry in WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !utils::is_windows_reparse_point(entry.path())
            })
            .filter_map(|e| e.ok())
        {
            clear_readonly_one(entry.path());
        }
    }

    fn remove(&self, path: &Path, kind: EntryKind) -> io::Result<()> {
        match kind {
            EntryKind::File => fs::remove_file(path),
            // Directory links: drop the link, never the target's contents.
            EntryKind::Directory if utils::is_windows_reparse_point(path) => fs::remove_dir(path),
            EntryKind::Directory => fs::remove_dir_all(path),
        }
    }

    fn schedule_delete_on_restart(&self, path: &Path, kind: EntryKind) -> bool {
        schedule_tree_on_restart(path, kind, schedule_delete_on_restart)
    }
}

/// Windows: drop `FILE_ATTRIBUTE_READONLY` and nothing else.
#[cfg(windows)]
fn clear_readonly_one(path: &Path) {
    use std::os::windows::fs::MetadataExt;
    use windows::core::HSTRING;
    use windows::Win32::Storage::FileSystem::{
        SetFileAttributesW, FILE_ATTRIBUTE_READONLY, FILE_FLAGS_AND_ATTRIBUTES,
    };

    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    let attributes = meta.file_attributes();
    if attributes & FILE_ATTRIBUTE_READONLY.0 == 0 {
        return;
    }
    // SAFETY: the HSTRING outlives the call.
    let cleared = unsafe {
        SetFileAttributesW(
            &HSTRING::from(path),
            FILE_FLAGS_AND_ATTRIBUTES(attributes & !FILE_ATTRIBUTE_READONLY.0),
        )
    };
    if let Err(err) = cleared {
        tracing::debug!(path = %path.display(), error = %err, "cannot clear read-only attribute");
    }
}

/// Unix: unlinking ignores the entry's own mode, so only directories need
/// owner write to have their children removed. Group and other bits are
/// left alone.
#[cfg(unix)]
fn clear_readonly_one(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let Ok(meta) = fs::symlink_metadata(path) else {
        return;
    };
    if !meta.is_dir() {
        return;
    }
    let mode = meta.permissions().mode();
    if mode & 0o200 == 0 {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode((mode | 0o200) & 0o7777));
    }
}

#[cfg(not(any(windows, unix)))]
fn clear_readonly_one(_path: &Path) {}

/// Schedule `path` for deletion at restart, contents first.
///
/// The OS only removes a directory at boot once it is empty, so every entry
/// below it is scheduled innermost first and the directory last. Stops at the
/// first refusal and reports `false`.
pub fn schedule_tree_on_restart<F>(path: &Path, kind: EntryKind, mut schedule_one: F) -> bool
where
    F: FnMut(&Path) -> bool,
{
    if kind == EntryKind::File || utils::is_windows_reparse_point(path) {
        return schedule_one(path);
    }
    for entry in WalkDir::new(path)
        .follow_links(false)
        .contents_first(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0 || !utils::is_windows_reparse_point(entry.path())
        })
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %err,
                    "cannot list for restart deletion"
                );
                return false;
            }
        };
        if !schedule_one(entry.path()) {
            return false;
        }
    }
    true
}

/// Mark `path` for removal by the OS at the next boot.
///
/// Uses `MoveFileExW` with `MOVEFILE_DELAY_UNTIL_REBOOT`, which writes the
/// request to `PendingFileRenameOperations` and needs administrator rights.
#[cfg(windows)]
pub fn schedule_delete_on_restart(path: &Path) -> bool {
    use windows::core::{HSTRING, PCWSTR};
    use windows::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_DELAY_UNTIL_REBOOT};

    let source = HSTRING::from(path);
    // SAFETY: `source` is a valid NUL-terminated wide string for the duration
    // of the call, and a null destination means "delete".
    let scheduled =
        unsafe { MoveFileExW(&source, PCWSTR::null(), MOVEFILE_DELAY_UNTIL_REBOOT) };
    match scheduled {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "delete-on-restart refused");
            false
        }
    }
}

#[cfg(not(windows))]
pub fn schedule_delete_on_restart(_path: &Path) -> bool {
    false
}

/// How the retry engine reacts to an I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The entry vanished; nothing to do.
    NotFound,
    /// Sharing violation, lock violation, device busy: retryable.
    Busy,
    /// Access denied or protected: never retried.
    PermissionDenied,
    Other,
}

#[cfg(windows)]
const BUSY_OS_ERRORS: &[i32] = &[
    32,  // ERROR_SHARING_VIOLATION
    33,  // ERROR_LOCK_VIOLATION
    145, // ERROR_DIR_NOT_EMPTY, a writer refilled the directory mid-removal
];

#[cfg(not(windows))]
const BUSY_OS_ERRORS: &[i32] = &[
    16, // EBUSY
    26, // ETXTBSY
];

pub fn classify(err: &io::Error) -> ErrorClass {
    if let Some(code) = err.raw_os_error() {
        if BUSY_OS_ERRORS.contains(&code) {
            return ErrorClass::Busy;
        }
    }
    match err.kind() {
        io::ErrorKind::NotFound => ErrorClass::NotFound,
        io::ErrorKind::PermissionDenied => ErrorClass::PermissionDenied,
        _ => ErrorClass::Other,
    }
}
