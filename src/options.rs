use crate::categories::Category;
use serde::{Deserialize, Serialize};

/// Independent switches for one cleanup invocation.
///
/// Built once by the caller and read-only afterwards. Each category switch is
/// independent of every other one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupOptions {
    pub include_system_temp: bool,
    pub clean_user_temp: bool,
    pub clean_browser_caches: bool,
    pub clean_browser_history: bool,
    pub clean_windows_update_cache: bool,
    pub clean_thumbnails: bool,
    pub clean_prefetch: bool,
    pub clean_error_reports: bool,
    pub clean_system_logs: bool,
    pub clean_app_caches: bool,
    pub clean_package_caches: bool,
    pub clean_orphaned_files: bool,

    // Sequential post-phase
    pub flush_dns: bool,
    pub empty_recycle_bin: bool,
    pub trim_memory: bool,

    /// Ask running browsers to exit before browser categories run.
    pub close_browsers: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

impl CleanupOptions {
    /// Every category enabled, no post-phase actions.
    pub fn all_categories() -> Self {
        let mut options = Self::default();
        for category in Category::ALL {
            options.set_category(category, true);
        }
        options
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::SystemTemp => self.include_system_temp,
            Category::UserTemp => self.clean_user_temp,
            Category::BrowserCache => self.clean_browser_caches,
            Category::BrowserHistory => self.clean_browser_history,
            Category::WindowsUpdate => self.clean_windows_update_cache,
            Category::Thumbnails => self.clean_thumbnails,
            Category::Prefetch => self.clean_prefetch,
            Category::ErrorReports => self.clean_error_reports,
            Category::SystemLogs => self.clean_system_logs,
            Category::AppCache => self.clean_app_caches,
            Category::PackageCache => self.clean_package_caches,
            Category::OrphanedShortcuts => self.clean_orphaned_files,
        }
    }

    pub fn set_category(&mut self, category: Category, enabled: bool) {
        let flag = match category {
            Category::SystemTemp => &mut self.include_system_temp,
            Category::UserTemp => &mut self.clean_user_temp,
            Category::BrowserCache => &mut self.clean_browser_caches,
            Category::BrowserHistory => &mut self.clean_browser_history,
            Category::WindowsUpdate => &mut self.clean_windows_update_cache,
            Category::Thumbnails => &mut self.clean_thumbnails,
            Category::Prefetch => &mut self.clean_prefetch,
            Category::ErrorReports => &mut self.clean_error_reports,
            Category::SystemLogs => &mut self.clean_system_logs,
            Category::AppCache => &mut self.clean_app_caches,
            Category::PackageCache => &mut self.clean_package_caches,
            Category::OrphanedShortcuts => &mut self.clean_orphaned_files,
        };
        *flag = enabled;
    }

    /// Enabled categories in catalogue order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|category| self.is_enabled(*category))
            .collect()
    }

    pub fn has_post_actions(&self) -> bool {
        self.flush_dns || self.empty_recycle_bin || self.trim_memory
    }
}
