//! Run results and the aggregator that is their only writer.

use crate::categories::Category;
use crate::cleaner::DirectoryTotals;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Per-category sub-counters. The sum over all categories equals the
/// run totals in [`CleanupResult`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub files_deleted: u64,
    pub bytes_freed: u64,
    pub deferred_on_restart: u64,
    pub failed_entries: u64,
}

impl CategoryTotals {
    fn add(&mut self, totals: &DirectoryTotals) {
        self.files_deleted += totals.files_deleted;
        self.bytes_freed += totals.bytes_freed;
        self.deferred_on_restart += totals.deferred_on_restart;
        self.failed_entries += totals.failed_entries;
    }
}

/// Outcome of a sequential post-phase action (DNS flush, recycle bin, memory trim).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostActionOutcome {
    /// Name of the action performed
    pub action: String,
    pub succeeded: bool,
    /// Human-readable message about the result
    pub message: String,
}

impl PostActionOutcome {
    pub fn success(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            succeeded: true,
            message: message.into(),
        }
    }

    pub fn failure(action: &str, message: impl Into<String>) -> Self {
        Self {
            action: action.to_string(),
            succeeded: false,
            message: message.into(),
        }
    }

    /// Dry runs record what would have happened; not an error.
    pub fn skipped(action: &str, message: &str) -> Self {
        Self {
            action: action.to_string(),
            succeeded: true,
            message: format!("Skipped: {}", message),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupResult {
    pub files_deleted: u64,
    pub bytes_freed: u64,
    /// Subset of `files_deleted` that the OS removes at the next restart.
    pub deferred_on_restart: u64,
    pub failed_entries: u64,
    pub cancelled: bool,
    pub dry_run: bool,
    pub categories: BTreeMap<Category, CategoryTotals>,
    pub post_actions: Vec<PostActionOutcome>,
}

impl CleanupResult {
    pub fn category(&self, category: Category) -> CategoryTotals {
        self.categories.get(&category).copied().unwrap_or_default()
    }

    pub fn app_cache_files_deleted(&self) -> u64 {
        self.category(Category::AppCache).files_deleted
    }
}

/// Shared, mutex-protected accumulator for one run.
///
/// Counters only ever grow; units hand in their totals once they finish.
#[derive(Debug, Default)]
pub struct Aggregator {
    inner: Mutex<CleanupResult>,
}

impl Aggregator {
    pub fn new(dry_run: bool) -> Self {
        Self {
            inner: Mutex::new(CleanupResult {
                dry_run,
                ..Default::default()
            }),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut CleanupResult) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    /// Make a category visible in the result even if it reclaimed nothing.
    pub fn ensure_category(&self, category: Category) {
        self.with(|result| {
            result.categories.entry(category).or_default();
        });
    }

    pub fn add(&self, category: Category, totals: DirectoryTotals) {
        self.with(|result| {
            result.files_deleted += totals.files_deleted;
            result.bytes_freed += totals.bytes_freed;
            result.deferred_on_restart += totals.deferred_on_restart;
            result.failed_entries += totals.failed_entries;
            result.categories.entry(category).or_default().add(&totals);
        });
    }

    pub fn record_action(&self, outcome: PostActionOutcome) {
        self.with(|result| result.post_actions.push(outcome));
    }

    pub fn mark_cancelled(&self) {
        self.with(|result| result.cancelled = true);
    }

    pub fn snapshot(&self) -> CleanupResult {
        self.with(|result| result.clone())
    }

    pub fn into_result(self) -> CleanupResult {
        self.inner.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn totals(files: u64, bytes: u64) -> DirectoryTotals {
        DirectoryTotals {
            files_deleted: files,
            bytes_freed: bytes,
            ..Default::default()
        }
    }

    #[test]
    fn test_category_sums_match_totals() {
        let aggregator = Aggregator::new(false);
        aggregator.add(Category::UserTemp, totals(3, 300));
        aggregator.add(Category::AppCache, totals(2, 50));
        aggregator.add(Category::UserTemp, totals(1, 1));

        let result = aggregator.into_result();
        assert_eq!(result.files_deleted, 6);
        assert_eq!(result.bytes_freed, 351);
        assert_eq!(result.category(Category::UserTemp).files_deleted, 4);
        assert_eq!(result.app_cache_files_deleted(), 2);
        let summed: u64 = result.categories.values().map(|c| c.bytes_freed).sum();
        assert_eq!(summed, result.bytes_freed);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let aggregator = Arc::new(Aggregator::new(false));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        aggregator.add(Category::UserTemp, totals(1, 2));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let result = aggregator.snapshot();
        assert_eq!(result.files_deleted, 8000);
        assert_eq!(result.bytes_freed, 16000);
    }

    #[test]
    fn test_ensure_category_and_actions() {
        let aggregator = Aggregator::new(true);
        aggregator.ensure_category(Category::Prefetch);
        aggregator.record_action(PostActionOutcome::skipped("Flush DNS", "dry run"));
        aggregator.mark_cancelled();

        let result = aggregator.snapshot();
        assert!(result.dry_run);
        assert!(result.cancelled);
        assert_eq!(result.category(Category::Prefetch), CategoryTotals::default());
        assert!(result.categories.contains_key(&Category::Prefetch));
        assert_eq!(result.post_actions[0].message, "Skipped: dry run");
    }

    #[test]
    fn test_serializes_category_ids() {
        let aggregator = Aggregator::new(false);
        aggregator.add(Category::BrowserCache, totals(1, 10));
        let json = serde_json::to_value(aggregator.snapshot()).unwrap();
        assert_eq!(json["categories"]["browser_cache"]["bytes_freed"], 10);
    }
}
