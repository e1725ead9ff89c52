//! Read-only preview of what a cleanup would touch.
//!
//! The scanner walks the same targets the reclaimer does, but recursively and
//! without mutating anything. Only entries a real run would reclaim are
//! inventoried: the top-level entries a target selects, plus everything below
//! the selected directories.

use crate::cancel::CancellationToken;
use crate::categories::Category;
use crate::options::CleanupOptions;
use crate::targets::{Target, TargetResolver};
use crate::utils;
use chrono::{DateTime, Local};
use jwalk::WalkDir;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const SCAN_BUSY_TIMEOUT: Duration = Duration::from_secs(2);

/// One scanned filesystem object. Directories are listed with size 0; their
/// bytes are carried by the files below them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportItem {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub is_directory: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub category: Category,
    pub root: PathBuf,
    pub items: Vec<ReportItem>,
}

impl ReportSection {
    pub fn total_bytes(&self) -> u64 {
        self.items.iter().map(|item| item.size_bytes).sum()
    }

    /// Items directly under the root, i.e. what a run reclaims one by one.
    pub fn top_level_items(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.path.parent() == Some(self.root.as_path()))
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub generated_at: DateTime<Local>,
    pub sections: Vec<ReportSection>,
}

/// Per-category roll-up used by the preview output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategorySummary {
    pub items: usize,
    pub bytes: u64,
}

impl CleanupReport {
    pub fn total_bytes(&self) -> u64 {
        self.sections.iter().map(ReportSection::total_bytes).sum()
    }

    pub fn total_items(&self) -> usize {
        self.sections.iter().map(|section| section.items.len()).sum()
    }

    pub fn top_level_items(&self) -> usize {
        self.sections.iter().map(ReportSection::top_level_items).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_items() == 0
    }

    pub fn by_category(&self) -> BTreeMap<Category, CategorySummary> {
        let mut summary: BTreeMap<Category, CategorySummary> = BTreeMap::new();
        for section in &self.sections {
            let entry = summary.entry(section.category).or_default();
            entry.items += section.items.len();
            entry.bytes += section.total_bytes();
        }
        summary
    }

    /// The `limit` largest files across all sections.
    pub fn largest(&self, limit: usize) -> Vec<(Category, &ReportItem)> {
        let mut items: Vec<(Category, &ReportItem)> = self
            .sections
            .iter()
            .flat_map(|section| section.items.iter().map(move |item| (section.category, item)))
            .filter(|(_, item)| !item.is_directory)
            .collect();
        items.sort_by(|a, b| b.1.size_bytes.cmp(&a.1.size_bytes));
        items.truncate(limit);
        items
    }
}

/// Inventory everything under `root`.
pub fn scan_root(root: &Path, cancel: &CancellationToken) -> Vec<ReportItem> {
    walk(root, None, cancel)
}

/// Inventory what a real run over `target` would reclaim.
pub fn scan(target: &Target, cancel: &CancellationToken) -> Vec<ReportItem> {
    walk(&target.root, Some(target.clone()), cancel)
}

/// Resolve `options` and scan every target.
pub fn build_report(
    resolver: &TargetResolver,
    options: &CleanupOptions,
    cancel: &CancellationToken,
) -> CleanupReport {
    let sections = resolver
        .resolve(options)
        .iter()
        .take_while(|_| !cancel.is_cancelled())
        .map(|target| {
            let items = scan(target, cancel);
            debug!(
                category = target.category.id(),
                root = %target.root.display(),
                items = items.len(),
                "scanned target"
            );
            ReportSection {
                category: target.category,
                root: target.root.clone(),
                items,
            }
        })
        .collect();

    CleanupReport {
        generated_at: Local::now(),
        sections,
    }
}

fn walk(root: &Path, target: Option<Target>, cancel: &CancellationToken) -> Vec<ReportItem> {
    if root.as_os_str().is_empty() || !root.is_dir() {
        return Vec::new();
    }

    let walk_cancel = cancel.clone();
    let walker = WalkDir::new(root)
        .skip_hidden(false)
        .follow_links(false)
        .parallelism(jwalk::Parallelism::RayonDefaultPool {
            busy_timeout: SCAN_BUSY_TIMEOUT,
        })
        .process_read_dir(move |_depth, _path, _state, children| {
            if walk_cancel.is_cancelled() {
                children.clear();
                return;
            }
            if let Some(target) = &target {
                children.retain(|entry| match entry {
                    Ok(e) if e.depth == 1 => target.selects(&e.path()),
                    Ok(e) => !target.is_excluded(&e.path()),
                    Err(_) => true,
                });
            }
            // Junctions are removed as links, never descended into.
            for entry in children.iter_mut().flatten() {
                if entry.file_type().is_dir() && utils::is_windows_reparse_point(&entry.path()) {
                    entry.read_children_path = None;
                }
            }
        });

    let mut items = Vec::new();
    for entry in walker {
        if cancel.is_cancelled() {
            break;
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(root = %root.display(), error = %err, "skipping unreadable entry");
                continue;
            }
        };
        if entry.depth == 0 {
            continue;
        }

        let path = entry.path();
        let file_type = entry.file_type();
        let size_bytes = if file_type.is_file() || (file_type.is_symlink() && entry.depth == 1) {
            match std::fs::symlink_metadata(&path) {
                Ok(meta) => meta.len(),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "cannot size entry");
                    0
                }
            }
        } else {
            0
        };

        items.push(ReportItem {
            path,
            size_bytes,
            is_directory: file_type.is_dir(),
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::KnownFolders;
    use crate::targets::EntryFilter;
    use std::fs;

    fn populate(root: &Path) {
        fs::write(root.join("a.tmp"), vec![0u8; 1024]).unwrap();
        fs::write(root.join("b.tmp"), vec![0u8; 2048]).unwrap();
        fs::create_dir(root.join("sub")).unwrap();
    }

    #[test]
    fn test_scan_root_is_recursive() {
        let temp_dir = tempfile::tempdir().unwrap();
        populate(temp_dir.path());
        fs::write(temp_dir.path().join("sub").join("deep.bin"), vec![0u8; 10]).unwrap();

        let items = scan_root(temp_dir.path(), &CancellationToken::new());
        assert_eq!(items.len(), 4);
        let total: u64 = items.iter().map(|i| i.size_bytes).sum();
        assert_eq!(total, 3082);
        let sub = items.iter().find(|i| i.path.ends_with("sub")).unwrap();
        assert!(sub.is_directory);
        assert_eq!(sub.size_bytes, 0);
    }

    #[test]
    fn test_scan_is_read_only() {
        let temp_dir = tempfile::tempdir().unwrap();
        populate(temp_dir.path());
        scan_root(temp_dir.path(), &CancellationToken::new());
        assert!(temp_dir.path().join("a.tmp").exists());
        assert!(temp_dir.path().join("sub").is_dir());
    }

    #[test]
    fn test_scan_applies_target_filter_at_top_level() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::write(root.join("A.PF"), vec![0u8; 7]).unwrap();
        fs::write(root.join("Layout.ini"), vec![0u8; 5]).unwrap();
        fs::create_dir(root.join("ReadyBoot")).unwrap();
        fs::write(root.join("ReadyBoot").join("trace.pf"), vec![0u8; 3]).unwrap();

        let target = Target::new(
            Category::Prefetch,
            root.to_path_buf(),
            EntryFilter::names(&["*.pf"]),
        );
        let items = scan(&target, &CancellationToken::new());
        assert_eq!(items.len(), 1);
        assert!(items[0].path.ends_with("A.PF"));
    }

    #[test]
    fn test_cancelled_scan_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        populate(temp_dir.path());
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(scan_root(temp_dir.path(), &cancel).is_empty());
    }

    #[test]
    fn test_missing_root() {
        let temp_dir = tempfile::tempdir().unwrap();
        assert!(scan_root(&temp_dir.path().join("nope"), &CancellationToken::new()).is_empty());
    }

    #[test]
    fn test_build_report_rolls_up_by_category() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolver = TargetResolver::new(KnownFolders::rooted_at(temp_dir.path()));
        let temp = resolver.folders().user_temp.clone().unwrap();
        fs::create_dir_all(&temp).unwrap();
        populate(&temp);

        let options = CleanupOptions {
            clean_user_temp: true,
            ..Default::default()
        };
        let report = build_report(&resolver, &options, &CancellationToken::new());
        assert_eq!(report.total_items(), 3);
        assert_eq!(report.total_bytes(), 3072);
        assert_eq!(
            report.by_category()[&Category::UserTemp],
            CategorySummary { items: 3, bytes: 3072 }
        );
        let largest = report.largest(1);
        assert!(largest[0].1.path.ends_with("b.tmp"));
    }

    #[test]
    fn test_top_level_items_ignore_nested_entries() {
        let temp_dir = tempfile::tempdir().unwrap();
        let resolver = TargetResolver::new(KnownFolders::rooted_at(temp_dir.path()));
        let temp = resolver.folders().user_temp.clone().unwrap();
        fs::create_dir_all(&temp).unwrap();
        populate(&temp);
        fs::write(temp.join("sub").join("deep.bin"), vec![0u8; 10]).unwrap();

        let options = CleanupOptions {
            clean_user_temp: true,
            ..Default::default()
        };
        let report = build_report(&resolver, &options, &CancellationToken::new());
        assert_eq!(report.total_items(), 4);
        assert_eq!(report.top_level_items(), 3);
    }

    #[test]
    fn test_scan_prunes_excluded_subtrees_at_any_depth() {
        let temp_dir = tempfile::tempdir().unwrap();
        let exclusions = crate::targets::exclusion_set(&["**/keep-me/**".to_string()]).unwrap();
        let resolver = TargetResolver::new(KnownFolders::rooted_at(temp_dir.path()))
            .with_exclusions(exclusions);
        let target = resolver.targets_for(Category::UserTemp).remove(0);
        let root = &target.root;
        fs::create_dir_all(root.join("keep-me")).unwrap();
        fs::write(root.join("keep-me").join("important.txt"), vec![0u8; 4000]).unwrap();
        fs::create_dir_all(root.join("proj").join("keep-me")).unwrap();
        fs::write(root.join("proj").join("keep-me").join("nested.txt"), vec![0u8; 5]).unwrap();
        fs::write(root.join("proj").join("out.log"), vec![0u8; 10]).unwrap();
        fs::write(root.join("junk.tmp"), vec![0u8; 100]).unwrap();

        let items = scan(&target, &CancellationToken::new());
        let total: u64 = items.iter().map(|i| i.size_bytes).sum();
        assert_eq!(total, 110);
        assert!(items.iter().all(|i| !i.path.to_string_lossy().contains("keep-me")));
    }
}
