//! Cleanup categories and the folder layouts they map to.
//!
//! Each submodule knows where one family of transient data lives relative to
//! [`KnownFolders`]; the mapping from enabled options to concrete targets is
//! done by [`crate::targets::TargetResolver`].

pub mod app_cache;
pub mod browser;
pub mod known_folders;
pub mod package_cache;
pub mod shortcuts;
pub mod system;

pub use known_folders::KnownFolders;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One independently toggleable cleanup target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SystemTemp,
    UserTemp,
    BrowserCache,
    BrowserHistory,
    WindowsUpdate,
    Thumbnails,
    Prefetch,
    ErrorReports,
    SystemLogs,
    AppCache,
    PackageCache,
    OrphanedShortcuts,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::SystemTemp,
        Category::UserTemp,
        Category::BrowserCache,
        Category::BrowserHistory,
        Category::WindowsUpdate,
        Category::Thumbnails,
        Category::Prefetch,
        Category::ErrorReports,
        Category::SystemLogs,
        Category::AppCache,
        Category::PackageCache,
        Category::OrphanedShortcuts,
    ];

    /// Stable machine-readable id, also used in JSON output.
    pub fn id(self) -> &'static str {
        match self {
            Category::SystemTemp => "system_temp",
            Category::UserTemp => "user_temp",
            Category::BrowserCache => "browser_cache",
            Category::BrowserHistory => "browser_history",
            Category::WindowsUpdate => "windows_update",
            Category::Thumbnails => "thumbnails",
            Category::Prefetch => "prefetch",
            Category::ErrorReports => "error_reports",
            Category::SystemLogs => "system_logs",
            Category::AppCache => "app_cache",
            Category::PackageCache => "package_cache",
            Category::OrphanedShortcuts => "orphaned_shortcuts",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::SystemTemp => "System Temp",
            Category::UserTemp => "User Temp",
            Category::BrowserCache => "Browser Cache",
            Category::BrowserHistory => "Browser History",
            Category::WindowsUpdate => "Windows Update Cache",
            Category::Thumbnails => "Thumbnail Cache",
            Category::Prefetch => "Prefetch",
            Category::ErrorReports => "Error Reports",
            Category::SystemLogs => "System Logs",
            Category::AppCache => "Application Cache",
            Category::PackageCache => "Package Cache",
            Category::OrphanedShortcuts => "Orphaned Shortcuts",
        }
    }

    /// Browser categories may ask running browsers to close first.
    pub fn is_browser(self) -> bool {
        matches!(self, Category::BrowserCache | Category::BrowserHistory)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<&str> = Category::ALL.iter().map(|c| c.id()).collect();
        assert_eq!(ids.len(), Category::ALL.len());
    }

    #[test]
    fn test_serde_id_matches() {
        for category in Category::ALL {
            let json = serde_json::to_string(&category).unwrap();
            assert_eq!(json, format!("\"{}\"", category.id()));
        }
    }

    #[test]
    fn test_browser_categories() {
        let browsers: Vec<Category> =
            Category::ALL.into_iter().filter(|c| c.is_browser()).collect();
        assert_eq!(browsers, vec![Category::BrowserCache, Category::BrowserHistory]);
    }
}
