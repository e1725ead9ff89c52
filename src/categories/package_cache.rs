//! Package manager download caches. All of them are rebuilt on demand.

use super::KnownFolders;
use crate::targets::EntryFilter;
use crate::utils::join_segments;
use std::path::PathBuf;

enum CacheLocation {
    LocalAppData(&'static [&'static str]),
    UserProfile(&'static [&'static str]),
}

/// Each tuple is (name, location)
const CACHE_LOCATIONS: &[(&str, CacheLocation)] = &[
    ("npm", CacheLocation::LocalAppData(&["npm-cache"])),
    ("pip", CacheLocation::LocalAppData(&["pip", "cache"])),
    ("yarn", CacheLocation::LocalAppData(&["Yarn", "Cache"])),
    ("pnpm", CacheLocation::LocalAppData(&["pnpm-cache"])),
    ("NuGet", CacheLocation::LocalAppData(&["NuGet", "v3-cache"])),
    ("Go build", CacheLocation::LocalAppData(&["go-build"])),
    ("Gradle", CacheLocation::UserProfile(&[".gradle", "caches"])),
];

pub fn cache_dirs(folders: &KnownFolders) -> Option<Vec<(PathBuf, EntryFilter)>> {
    if folders.local_app_data.is_none() && folders.user_profile.is_none() {
        return None;
    }

    let roots = CACHE_LOCATIONS
        .iter()
        .filter_map(|(_name, location)| match location {
            CacheLocation::LocalAppData(segments) => folders
                .local_app_data
                .as_ref()
                .map(|base| join_segments(base, segments)),
            CacheLocation::UserProfile(segments) => folders
                .user_profile
                .as_ref()
                .map(|base| join_segments(base, segments)),
        })
        .map(|root| (root, EntryFilter::All))
        .collect();
    Some(roots)
}
