//! Browser cache and history locations.
//!
//! Chromium-family browsers keep one directory per profile (`Default`,
//! `Profile 1`, ...) under `User Data`; Firefox keeps its disk cache under
//! `%LOCALAPPDATA%\Mozilla\Firefox\Profiles\<profile>\cache2`.

use super::KnownFolders;
use crate::targets::EntryFilter;
use crate::utils::join_segments;
use std::path::{Path, PathBuf};

/// (name, path of `User Data` relative to `%LOCALAPPDATA%`)
const CHROMIUM_BROWSERS: &[(&str, &[&str])] = &[
    ("Chrome", &["Google", "Chrome", "User Data"]),
    ("Chrome (Beta)", &["Google", "Chrome Beta", "User Data"]),
    ("Chrome (Dev)", &["Google", "Chrome Dev", "User Data"]),
    ("Edge", &["Microsoft", "Edge", "User Data"]),
    ("Edge (Beta)", &["Microsoft", "Edge Beta", "User Data"]),
    ("Brave", &["BraveSoftware", "Brave-Browser", "User Data"]),
    ("Vivaldi", &["Vivaldi", "User Data"]),
];

/// Per-profile cache directories of a Chromium profile.
const CHROMIUM_CACHE_DIRS: &[&[&str]] = &[
    &["Cache", "Cache_Data"],
    &["Code Cache"],
    &["GPUCache"],
];

/// History databases inside a Chromium profile. Bookmarks, cookies and
/// passwords live in other files and are never matched.
const CHROMIUM_HISTORY_FILES: &[&str] = &[
    "History",
    "History-journal",
    "Visited Links",
    "Top Sites",
    "Top Sites-journal",
];

/// Default executable names closed before browser cleanup.
pub const BROWSER_PROCESSES: &[&str] = &[
    "chrome.exe",
    "msedge.exe",
    "firefox.exe",
    "brave.exe",
    "opera.exe",
    "vivaldi.exe",
];

fn chromium_user_data_dirs(local: &Path) -> Vec<PathBuf> {
    CHROMIUM_BROWSERS
        .iter()
        .map(|(_name, segments)| join_segments(local, segments))
        .collect()
}

/// `Default` and `Profile N` directories under a `User Data` folder.
fn chromium_profiles(user_data: &Path) -> Vec<PathBuf> {
    let Ok(read_dir) = std::fs::read_dir(user_data) else {
        return Vec::new();
    };
    let mut profiles: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n == "Default" || n.starts_with("Profile "))
                .unwrap_or(false)
        })
        .collect();
    profiles.sort();
    profiles
}

fn firefox_profiles(local: &Path) -> Vec<PathBuf> {
    let profiles_dir = join_segments(local, &["Mozilla", "Firefox", "Profiles"]);
    let Ok(read_dir) = std::fs::read_dir(&profiles_dir) else {
        return Vec::new();
    };
    let mut profiles: Vec<PathBuf> = read_dir
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    profiles.sort();
    profiles
}

/// Cache directories of every installed browser profile.
pub fn cache_dirs(folders: &KnownFolders) -> Option<Vec<(PathBuf, EntryFilter)>> {
    let local = folders.local_app_data.as_ref()?;
    let mut roots = Vec::new();

    for user_data in chromium_user_data_dirs(local) {
        for profile in chromium_profiles(&user_data) {
            for segments in CHROMIUM_CACHE_DIRS {
                roots.push((join_segments(&profile, segments), EntryFilter::All));
            }
        }
    }

    // Opera keeps its cache outside of a `User Data` tree.
    roots.push((
        join_segments(local, &["Opera Software", "Opera Stable", "Cache"]),
        EntryFilter::All,
    ));

    for profile in firefox_profiles(local) {
        roots.push((profile.join("cache2"), EntryFilter::All));
    }

    Some(roots)
}

/// Chromium profile directories, filtered down to the history databases.
///
/// Firefox history lives in `places.sqlite` together with bookmarks, so it is
/// deliberately not touched.
pub fn history_dirs(folders: &KnownFolders) -> Option<Vec<(PathBuf, EntryFilter)>> {
    let local = folders.local_app_data.as_ref()?;
    Some(
        chromium_user_data_dirs(local)
            .iter()
            .flat_map(|user_data| chromium_profiles(user_data))
            .map(|profile| (profile, EntryFilter::names(CHROMIUM_HISTORY_FILES)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_cache_dirs_follow_profiles() {
        let temp_dir = tempfile::tempdir().unwrap();
        let folders = KnownFolders::rooted_at(temp_dir.path());
        let local = folders.local_app_data.clone().unwrap();
        let user_data = join_segments(&local, &["Google", "Chrome", "User Data"]);
        fs::create_dir_all(user_data.join("Default")).unwrap();
        fs::create_dir_all(user_data.join("Profile 2")).unwrap();
        fs::create_dir_all(user_data.join("Crashpad")).unwrap();
        let firefox_profile =
            join_segments(&local, &["Mozilla", "Firefox", "Profiles", "abc.default"]);
        fs::create_dir_all(firefox_profile).unwrap();

        let roots: Vec<PathBuf> =
            cache_dirs(&folders).unwrap().into_iter().map(|(r, _)| r).collect();

        assert!(roots.contains(&join_segments(&user_data, &["Default", "Cache", "Cache_Data"])));
        assert!(roots.contains(&join_segments(&user_data, &["Profile 2", "GPUCache"])));
        assert!(!roots.iter().any(|r| r.starts_with(user_data.join("Crashpad"))));
        assert!(roots.contains(&join_segments(
            &local,
            &["Mozilla", "Firefox", "Profiles", "abc.default", "cache2"]
        )));
    }

    #[test]
    fn test_history_filter_spares_bookmarks() {
        let temp_dir = tempfile::tempdir().unwrap();
        let folders = KnownFolders::rooted_at(temp_dir.path());
        let local = folders.local_app_data.clone().unwrap();
        let profile = join_segments(&local, &["Microsoft", "Edge", "User Data", "Default"]);
        fs::create_dir_all(&profile).unwrap();

        let (root, filter) = history_dirs(&folders).unwrap().remove(0);
        assert_eq!(root, profile);
        assert!(filter.matches(&profile.join("History")));
        assert!(filter.matches(&profile.join("Visited Links")));
        assert!(!filter.matches(&profile.join("Bookmarks")));
        assert!(!filter.matches(&profile.join("Cookies")));
    }

    #[test]
    fn test_no_local_app_data() {
        assert!(cache_dirs(&KnownFolders::default()).is_none());
        assert!(history_dirs(&KnownFolders::default()).is_none());
    }
}
