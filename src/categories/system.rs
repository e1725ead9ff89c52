//! Windows system locations: temp folders, update caches, thumbnails,
//! prefetch, error reports and servicing logs.
//!
//! Every function returns `None` when the base folder it needs is unknown, and
//! otherwise the `(root, filter)` pairs for that category. Roots are returned
//! even if they do not exist yet; the reclaimer treats a missing root as a
//! no-op.

use super::KnownFolders;
use crate::targets::EntryFilter;
use crate::utils::{join_segments, push_unique};
use std::path::PathBuf;

type Roots = Option<Vec<(PathBuf, EntryFilter)>>;

const THUMBNAIL_PATTERNS: &[&str] = &["thumbcache_*.db", "iconcache_*.db"];
const PREFETCH_PATTERNS: &[&str] = &["*.pf"];
const LOG_PATTERNS: &[&str] = &["*.log", "*.etl", "*.cab"];

/// `%SystemRoot%\Temp`
pub fn system_temp(folders: &KnownFolders) -> Roots {
    let root = folders.system_root.as_ref()?;
    Some(vec![(root.join("Temp"), EntryFilter::All)])
}

/// `%TEMP%` and `%LOCALAPPDATA%\Temp`, deduplicated.
pub fn user_temp(folders: &KnownFolders) -> Roots {
    let mut roots = Vec::new();
    if let Some(temp) = &folders.user_temp {
        push_unique(&mut roots, temp.clone());
    }
    if let Some(local) = &folders.local_app_data {
        push_unique(&mut roots, local.join("Temp"));
    }
    if roots.is_empty() {
        return None;
    }
    Some(roots.into_iter().map(|r| (r, EntryFilter::All)).collect())
}

/// Windows Update download cache and the Delivery Optimization cache.
pub fn windows_update(folders: &KnownFolders) -> Roots {
    let root = folders.system_root.as_ref()?;
    Some(vec![
        (
            join_segments(root, &["SoftwareDistribution", "Download"]),
            EntryFilter::All,
        ),
        (
            join_segments(
                root,
                &[
                    "ServiceProfiles",
                    "NetworkService",
                    "AppData",
                    "Local",
                    "Microsoft",
                    "Windows",
                    "DeliveryOptimization",
                    "Cache",
                ],
            ),
            EntryFilter::All,
        ),
    ])
}

/// Explorer thumbnail and icon cache databases.
pub fn thumbnails(folders: &KnownFolders) -> Roots {
    let local = folders.local_app_data.as_ref()?;
    Some(vec![(
        join_segments(local, &["Microsoft", "Windows", "Explorer"]),
        EntryFilter::names(THUMBNAIL_PATTERNS),
    )])
}

/// `%SystemRoot%\Prefetch\*.pf`
pub fn prefetch(folders: &KnownFolders) -> Roots {
    let root = folders.system_root.as_ref()?;
    Some(vec![(root.join("Prefetch"), EntryFilter::names(PREFETCH_PATTERNS))])
}

/// Windows Error Reporting queues and user crash dumps.
pub fn error_reports(folders: &KnownFolders) -> Roots {
    let mut roots = Vec::new();
    if let Some(program_data) = &folders.program_data {
        let wer = join_segments(program_data, &["Microsoft", "Windows", "WER"]);
        roots.push((wer.join("ReportArchive"), EntryFilter::All));
        roots.push((wer.join("ReportQueue"), EntryFilter::All));
    }
    if let Some(local) = &folders.local_app_data {
        roots.push((local.join("CrashDumps"), EntryFilter::All));
    }
    if roots.is_empty() {
        None
    } else {
        Some(roots)
    }
}

/// Component servicing and update logs.
pub fn system_logs(folders: &KnownFolders) -> Roots {
    let root = folders.system_root.as_ref()?;
    Some(vec![
        (
            join_segments(root, &["Logs", "CBS"]),
            EntryFilter::names(LOG_PATTERNS),
        ),
        (
            join_segments(root, &["Logs", "WindowsUpdate"]),
            EntryFilter::names(LOG_PATTERNS),
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_user_temp_deduplicates() {
        let folders = KnownFolders::rooted_at(Path::new("base"));
        // rooted_at puts %TEMP% at %LOCALAPPDATA%\Temp
        assert_eq!(user_temp(&folders).unwrap().len(), 1);

        let mut split = folders.clone();
        split.user_temp = Some(PathBuf::from("elsewhere"));
        assert_eq!(user_temp(&split).unwrap().len(), 2);
    }

    #[test]
    fn test_system_categories_need_system_root() {
        let folders = KnownFolders::default();
        assert!(system_temp(&folders).is_none());
        assert!(windows_update(&folders).is_none());
        assert!(prefetch(&folders).is_none());
        assert!(system_logs(&folders).is_none());
        assert!(error_reports(&folders).is_none());
    }

    #[test]
    fn test_prefetch_filter() {
        let folders = KnownFolders::rooted_at(Path::new("base"));
        let (root, filter) = prefetch(&folders).unwrap().remove(0);
        assert!(root.ends_with("Prefetch"));
        assert!(filter.matches(&root.join("CHROME.EXE-1A2B3C4D.pf")));
        assert!(!filter.matches(&root.join("Layout.ini")));
    }

    #[test]
    fn test_thumbnail_filter_keeps_other_explorer_files() {
        let folders = KnownFolders::rooted_at(Path::new("base"));
        let (root, filter) = thumbnails(&folders).unwrap().remove(0);
        assert!(filter.matches(&root.join("thumbcache_1024.db")));
        assert!(filter.matches(&root.join("iconcache_48.db")));
        assert!(!filter.matches(&root.join("ExplorerStartupLog.etl")));
    }
}
