//! Desktop application caches (Electron apps, chat clients, launchers).

use super::KnownFolders;
use crate::targets::EntryFilter;
use crate::utils::join_segments;
use std::path::PathBuf;

enum AppCacheLocation {
    LocalAppData(&'static [&'static str]),
    RoamingAppData(&'static [&'static str]),
}

/// Each tuple is (name, location)
const APP_CACHE_LOCATIONS: &[(&str, AppCacheLocation)] = &[
    ("Discord", AppCacheLocation::RoamingAppData(&["discord", "Cache"])),
    ("Discord (code)", AppCacheLocation::RoamingAppData(&["discord", "Code Cache"])),
    ("VS Code", AppCacheLocation::RoamingAppData(&["Code", "Cache"])),
    ("VS Code (data)", AppCacheLocation::RoamingAppData(&["Code", "CachedData"])),
    ("Slack", AppCacheLocation::RoamingAppData(&["Slack", "Cache"])),
    ("Teams", AppCacheLocation::RoamingAppData(&["Microsoft", "Teams", "Cache"])),
    ("Spotify", AppCacheLocation::LocalAppData(&["Spotify", "Data"])),
    ("Steam", AppCacheLocation::LocalAppData(&["Steam", "htmlcache"])),
    ("Zoom", AppCacheLocation::RoamingAppData(&["Zoom", "data", "Cache"])),
    ("Notion", AppCacheLocation::RoamingAppData(&["Notion", "Cache"])),
    ("Figma", AppCacheLocation::LocalAppData(&["Figma", "Cache"])),
    ("Postman", AppCacheLocation::RoamingAppData(&["Postman", "Cache"])),
    ("GitHub Desktop", AppCacheLocation::RoamingAppData(&["GitHub Desktop", "Cache"])),
    ("Adobe Acrobat", AppCacheLocation::LocalAppData(&["Adobe", "Acrobat", "Cache"])),
    ("D3D shader cache", AppCacheLocation::LocalAppData(&["D3DSCache"])),
    ("NVIDIA shader cache", AppCacheLocation::LocalAppData(&["NVIDIA", "DXCache"])),
];

pub fn cache_dirs(folders: &KnownFolders) -> Option<Vec<(PathBuf, EntryFilter)>> {
    if folders.local_app_data.is_none() && folders.roaming_app_data.is_none() {
        return None;
    }

    let roots = APP_CACHE_LOCATIONS
        .iter()
        .filter_map(|(_name, location)| match location {
            AppCacheLocation::LocalAppData(segments) => folders
                .local_app_data
                .as_ref()
                .map(|base| join_segments(base, segments)),
            AppCacheLocation::RoamingAppData(segments) => folders
                .roaming_app_data
                .as_ref()
                .map(|base| join_segments(base, segments)),
        })
        .map(|root| (root, EntryFilter::All))
        .collect();
    Some(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_all_locations_resolve_with_both_bases() {
        let folders = KnownFolders::rooted_at(Path::new("base"));
        assert_eq!(cache_dirs(&folders).unwrap().len(), APP_CACHE_LOCATIONS.len());
    }

    #[test]
    fn test_roaming_only() {
        let folders = KnownFolders {
            roaming_app_data: Some(PathBuf::from("roaming")),
            ..Default::default()
        };
        let roots = cache_dirs(&folders).unwrap();
        assert!(!roots.is_empty());
        assert!(roots.iter().all(|(root, _)| root.starts_with("roaming")));
    }

    #[test]
    fn test_no_bases() {
        assert!(cache_dirs(&KnownFolders::default()).is_none());
    }
}
