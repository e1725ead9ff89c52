//! Shared path helpers used by the resolver, the size probe and the scanner.

use std::path::{Path, PathBuf};

/// Returns true if this path is a Windows reparse point (junction/symlink/mount point).
///
/// Junctions and some OneDrive placeholders are reparse points that are not
/// reported as symlinks, so walking into them can loop or escape the target.
pub fn is_windows_reparse_point(path: &Path) -> bool {
    #[cfg(windows)]
    {
        use std::os::windows::fs::MetadataExt;
        const FILE_ATTRIBUTE_REPARSE_POINT: u32 = 0x0400;
        if let Ok(meta) = std::fs::symlink_metadata(path) {
            return meta.file_attributes() & FILE_ATTRIBUTE_REPARSE_POINT != 0;
        }
        false
    }
    #[cfg(not(windows))]
    {
        let _ = path;
        false
    }
}

/// Join a list of path segments onto a base directory.
pub fn join_segments(base: &Path, segments: &[&str]) -> PathBuf {
    let mut path = base.to_path_buf();
    for segment in segments {
        path.push(segment);
    }
    path
}

/// Push `path` unless an equal path is already present.
///
/// `%TEMP%` and `%LOCALAPPDATA%\Temp` are usually the same folder; comparing
/// case-insensitively on Windows avoids reclaiming it twice.
pub fn push_unique(paths: &mut Vec<PathBuf>, path: PathBuf) {
    let already = paths.iter().any(|existing| same_path(existing, &path));
    if !already {
        paths.push(path);
    }
}

fn same_path(a: &Path, b: &Path) -> bool {
    if cfg!(windows) {
        a.to_string_lossy().eq_ignore_ascii_case(&b.to_string_lossy())
    } else {
        a == b
    }
}
