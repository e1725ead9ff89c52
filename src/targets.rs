//! Category-to-path resolution shared by preview and execution.
//!
//! The report scanner and the reclaimer both consume the `Vec<Target>` built
//! here, so a preview can never disagree with a real run about what would be
//! touched.

use crate::categories::shortcuts::{self, ShortcutResolver};
use crate::categories::{app_cache, browser, package_cache, system, Category, KnownFolders};
use crate::config::{Config, ConfigError};
use crate::options::CleanupOptions;
use crate::utils;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;
use walkdir::WalkDir;

/// Which immediate entries of a target root are candidates.
#[derive(Clone)]
pub enum EntryFilter {
    All,
    /// File-name globs, case-insensitive.
    Names(GlobSet),
    /// `.lnk` files whose resolved target no longer exists.
    OrphanedShortcuts(Arc<dyn ShortcutResolver>),
}

impl EntryFilter {
    /// Compile file-name globs. Invalid patterns are logged and skipped.
    pub fn names(patterns: &[&str]) -> Self {
        EntryFilter::Names(build_globset(patterns.iter().copied()))
    }

    pub fn matches(&self, path: &Path) -> bool {
        match self {
            EntryFilter::All => true,
            EntryFilter::Names(set) => path
                .file_name()
                .map(|name| set.is_match(Path::new(name)))
                .unwrap_or(false),
            EntryFilter::OrphanedShortcuts(resolver) => {
                shortcuts::is_orphaned(resolver.as_ref(), path)
            }
        }
    }
}

impl fmt::Debug for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryFilter::All => f.write_str("All"),
            EntryFilter::Names(set) => write!(f, "Names({} globs)", set.len()),
            EntryFilter::OrphanedShortcuts(_) => f.write_str("OrphanedShortcuts"),
        }
    }
}

fn build_globset<'a>(patterns: impl IntoIterator<Item = &'a str>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        match GlobBuilder::new(pattern).case_insensitive(true).build() {
            Ok(glob) => {
                builder.add(glob);
            }
            Err(err) => warn!(pattern, error = %err, "ignoring invalid glob"),
        }
    }
    builder.build().unwrap_or_else(|err| {
        warn!(error = %err, "glob set failed to build, matching nothing");
        GlobSet::empty()
    })
}

/// A root folder to reclaim from, with the filter deciding which of its
/// immediate entries are candidates.
#[derive(Debug, Clone)]
pub struct Target {
    pub category: Category,
    pub root: PathBuf,
    pub filter: EntryFilter,
    exclusions: Arc<GlobSet>,
}

impl Target {
    pub fn new(category: Category, root: PathBuf, filter: EntryFilter) -> Self {
        Self {
            category,
            root,
            filter,
            exclusions: Arc::new(GlobSet::empty()),
        }
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        !self.exclusions.is_empty() && self.exclusions.is_match(path)
    }

    pub fn has_exclusions(&self) -> bool {
        !self.exclusions.is_empty()
    }

    /// Whether an immediate entry of `root` should be reclaimed.
    pub fn selects(&self, path: &Path) -> bool {
        !self.is_excluded(path) && self.filter.matches(path)
    }

    /// Whether anything below directory `dir` is excluded, in which case the
    /// directory cannot be removed whole. Links are not followed.
    pub fn shelters(&self, dir: &Path) -> bool {
        if !self.has_exclusions() {
            return false;
        }
        WalkDir::new(dir)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                self.is_excluded(entry.path()) || !utils::is_windows_reparse_point(entry.path())
            })
            .filter_map(|entry| entry.ok())
            .any(|entry| self.is_excluded(entry.path()))
    }
}

/// Maps [`CleanupOptions`] to an ordered list of targets.
#[derive(Clone)]
pub struct TargetResolver {
    folders: KnownFolders,
    exclusions: Arc<GlobSet>,
    shortcuts: Arc<dyn ShortcutResolver>,
}

impl TargetResolver {
    pub fn new(folders: KnownFolders) -> Self {
        Self {
            folders,
            exclusions: Arc::new(GlobSet::empty()),
            shortcuts: shortcuts::default_resolver(),
        }
    }

    /// Resolver over the real environment with the config's exclusions.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(KnownFolders::from_env()).with_exclusions(config.exclusion_set()?))
    }

    pub fn with_exclusions(mut self, exclusions: GlobSet) -> Self {
        self.exclusions = Arc::new(exclusions);
        self
    }

    pub fn with_shortcut_resolver(mut self, resolver: Arc<dyn ShortcutResolver>) -> Self {
        self.shortcuts = resolver;
        self
    }

    pub fn folders(&self) -> &KnownFolders {
        &self.folders
    }

    /// Targets for every enabled category, in catalogue order.
    pub fn resolve(&self, options: &CleanupOptions) -> Vec<Target> {
        options
            .enabled_categories()
            .into_iter()
            .flat_map(|category| self.targets_for(category))
            .collect()
    }

    pub fn targets_for(&self, category: Category) -> Vec<Target> {
        let folders = &self.folders;
        let raw: Option<Vec<(PathBuf, EntryFilter)>> = match category {
            Category::SystemTemp => system::system_temp(folders),
            Category::UserTemp => system::user_temp(folders),
            Category::BrowserCache => browser::cache_dirs(folders),
            Category::BrowserHistory => browser::history_dirs(folders),
            Category::WindowsUpdate => system::windows_update(folders),
            Category::Thumbnails => system::thumbnails(folders),
            Category::Prefetch => system::prefetch(folders),
            Category::ErrorReports => system::error_reports(folders),
            Category::SystemLogs => system::system_logs(folders),
            Category::AppCache => app_cache::cache_dirs(folders),
            Category::PackageCache => package_cache::cache_dirs(folders),
            Category::OrphanedShortcuts => shortcuts::shortcut_dirs(folders).map(|dirs| {
                dirs.into_iter()
                    .map(|dir| (dir, EntryFilter::OrphanedShortcuts(Arc::clone(&self.shortcuts))))
                    .collect()
            }),
        };

        match raw {
            Some(pairs) => pairs
                .into_iter()
                .map(|(root, filter)| Target {
                    category,
                    root,
                    filter,
                    exclusions: Arc::clone(&self.exclusions),
                })
                .collect(),
            None => {
                warn!(category = category.id(), "base folder unavailable, category skipped");
                Vec::new()
            }
        }
    }
}

impl fmt::Debug for TargetResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetResolver")
            .field("folders", &self.folders)
            .field("exclusions", &self.exclusions.len())
            .finish()
    }
}

/// Compile user exclusion globs (matched against full paths).
///
/// A `<dir>/**` pattern also matches `<dir>` itself, so the folder is kept
/// along with its contents.
pub fn exclusion_set(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(exclusion_glob(pattern)?);
        let folder = pattern.strip_suffix("/**").filter(|dir| !dir.is_empty() && *dir != "**");
        if let Some(dir) = folder {
            builder.add(exclusion_glob(dir)?);
        }
    }
    builder.build()
}

fn exclusion_glob(pattern: &str) -> Result<globset::Glob, globset::Error> {
    GlobBuilder::new(pattern).case_insensitive(true).build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn resolver_in(base: &Path) -> TargetResolver {
        TargetResolver::new(KnownFolders::rooted_at(base))
    }

    #[test]
    fn test_disabled_options_resolve_nothing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let targets = resolver_in(temp_dir.path()).resolve(&CleanupOptions::default());
        assert!(targets.is_empty());
    }

    #[test]
    fn test_user_temp_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolver = resolver_in(temp_dir.path());
        let options = CleanupOptions {
            clean_user_temp: true,
            ..Default::default()
        };
        let targets = resolver.resolve(&options);
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].category, Category::UserTemp);
        assert_eq!(Some(&targets[0].root), resolver.folders().user_temp.as_ref());
    }

    #[test]
    fn test_missing_base_folder_skips_category() {
        let resolver = TargetResolver::new(KnownFolders::default());
        assert!(resolver.targets_for(Category::SystemTemp).is_empty());
        assert!(resolver.targets_for(Category::Prefetch).is_empty());
    }

    #[test]
    fn test_name_filter() {
        let filter = EntryFilter::names(&["thumbcache_*.db"]);
        assert!(filter.matches(Path::new("x/thumbcache_256.db")));
        assert!(filter.matches(Path::new("x/THUMBCACHE_32.DB")));
        assert!(!filter.matches(Path::new("x/iconcache.txt")));
    }

    #[test]
    fn test_exclusions_apply_to_selection() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exclusions = exclusion_set(&["**/keep-*".to_string()]).unwrap();
        let resolver = resolver_in(temp_dir.path()).with_exclusions(exclusions);
        let target = resolver.targets_for(Category::UserTemp).remove(0);

        fs::create_dir_all(&target.root).unwrap();
        assert!(target.selects(&target.root.join("junk.tmp")));
        assert!(!target.selects(&target.root.join("keep-me.tmp")));
    }

    #[test]
    fn test_recursive_exclusion_covers_folder_itself() {
        let exclusions = exclusion_set(&["**/keep-me/**".to_string()]).unwrap();
        assert!(exclusions.is_match(Path::new("/tmp/x/keep-me")));
        assert!(exclusions.is_match(Path::new("/tmp/x/keep-me/a.txt")));
        assert!(exclusions.is_match(Path::new("/tmp/x/KEEP-ME/deep/a.txt")));
        assert!(!exclusions.is_match(Path::new("/tmp/x/keep-me-not")));
    }

    #[test]
    fn test_shelters_nested_exclusion() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exclusions = exclusion_set(&["**/keep-me/**".to_string()]).unwrap();
        let resolver = resolver_in(temp_dir.path()).with_exclusions(exclusions);
        let target = resolver.targets_for(Category::UserTemp).remove(0);

        let proj = target.root.join("proj");
        fs::create_dir_all(proj.join("keep-me")).unwrap();
        fs::write(proj.join("keep-me").join("nested.txt"), "x").unwrap();
        let plain = target.root.join("plain");
        fs::create_dir_all(plain.join("deeper")).unwrap();

        assert!(target.selects(&proj));
        assert!(target.shelters(&proj));
        assert!(!target.shelters(&plain));
        assert!(!resolver_in(temp_dir.path()).targets_for(Category::UserTemp)[0].shelters(&proj));
    }

    #[test]
    fn test_invalid_exclusion_is_an_error() {
        assert!(exclusion_set(&["[unclosed".to_string()]).is_err());
    }
}
