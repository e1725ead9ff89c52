//! Lock test.
//!
//! Advisory only: the retry engine uses it to tell "held open by another
//! process" apart from other busy conditions in its logs. It never decides
//! whether a delete is attempted.

use std::path::Path;

/// Windows: `ERROR_SHARING_VIOLATION`, `ERROR_LOCK_VIOLATION`.
#[cfg(windows)]
const SHARING_VIOLATION_CODES: &[i32] = &[32, 33];

/// Check whether another process holds `path` open.
///
/// Opens the file for read with no sharing allowed. Only a sharing-violation
/// class failure counts as locked; "not found", "access denied" and every
/// other error report `false`.
#[cfg(windows)]
pub fn is_locked(path: &Path) -> bool {
    use std::fs::OpenOptions;
    use std::os::windows::fs::OpenOptionsExt;

    match OpenOptions::new().read(true).share_mode(0).open(path) {
        Ok(_) => false,
        Err(err) => err
            .raw_os_error()
            .map(|code| SHARING_VIOLATION_CODES.contains(&code))
            .unwrap_or(false),
    }
}

/// Unix locks are advisory and never prevent unlinking.
#[cfg(not(windows))]
pub fn is_locked(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_unlocked_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("unlocked.txt");
        fs::write(&file, "test").unwrap();

        assert!(!is_locked(&file));
    }

    #[test]
    fn test_nonexistent_is_not_locked() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(!is_locked(&temp_dir.path().join("nonexistent.txt")));
    }

    #[cfg(windows)]
    #[test]
    fn test_exclusively_open_file_is_locked() {
        use std::fs::OpenOptions;
        use std::os::windows::fs::OpenOptionsExt;

        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("held.txt");
        fs::write(&file, "test").unwrap();

        let _held = OpenOptions::new()
            .read(true)
            .share_mode(0)
            .open(&file)
            .unwrap();
        assert!(is_locked(&file));
    }
}
