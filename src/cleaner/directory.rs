//! Directory reclaimer.
//!
//! Lists the immediate entries of a target root and hands each one, whole, to
//! the retry engine, splitting only directories that hold excluded paths.
//! Entries are processed on a small dedicated pool so one category never
//! floods the disk or the handle table, and a failure on one
//! entry never stops its siblings.

use super::ops::ReclaimOps;
use super::retry::{reclaim_entry, ReclaimAttempt, ReclaimOutcome};
use crate::cancel::CancellationToken;
use crate::logging::ProgressLog;
use crate::targets::Target;
use crate::utils;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Default cap on concurrently processed entries within one directory.
pub const DEFAULT_ENTRY_WORKERS: usize = 4;

/// Totals for one directory walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryTotals {
    pub files_deleted: u64,
    pub bytes_freed: u64,
    pub deferred_on_restart: u64,
    pub failed_entries: u64,
}

impl DirectoryTotals {
    fn fold(&mut self, attempt: &ReclaimAttempt) {
        if attempt.success() {
            self.files_deleted += 1;
            self.bytes_freed += attempt.bytes_freed();
        }
        if attempt.outcome == ReclaimOutcome::DeferredOnRestart {
            self.deferred_on_restart += 1;
        }
        if attempt.outcome.is_failure() {
            self.failed_entries += 1;
        }
    }

    pub fn merge(&mut self, other: DirectoryTotals) {
        self.files_deleted += other.files_deleted;
        self.bytes_freed += other.bytes_freed;
        self.deferred_on_restart += other.deferred_on_restart;
        self.failed_entries += other.failed_entries;
    }
}

/// Per-entry engine plus the bounded pool it runs on.
pub struct Reclaimer {
    ops: Arc<dyn ReclaimOps>,
    log: ProgressLog,
    entry_workers: usize,
}

impl Reclaimer {
    pub fn new(ops: Arc<dyn ReclaimOps>, log: ProgressLog) -> Self {
        Self {
            ops,
            log,
            entry_workers: DEFAULT_ENTRY_WORKERS,
        }
    }

    pub fn with_entry_workers(mut self, workers: usize) -> Self {
        self.entry_workers = workers.max(1);
        self
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn ops(&self) -> &dyn ReclaimOps {
        self.ops.as_ref()
    }

    /// Reclaim every immediate entry of `root`.
    pub fn reclaim_directory(
        &self,
        root: &Path,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> DirectoryTotals {
        let entries = self.list(root).unwrap_or_default();
        self.reclaim_units(entries, dry_run, cancel)
    }

    /// Reclaim the entries of `target.root` that the target selects.
    ///
    /// A selected directory holding excluded paths is never removed whole:
    /// its children are reclaimed one by one around the excluded ones and the
    /// directory itself stays.
    pub fn reclaim_target(
        &self,
        target: &Target,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> DirectoryTotals {
        let mut units = Vec::new();
        for path in self.list(&target.root).unwrap_or_default() {
            if target.selects(&path) {
                self.plan_entry(target, path, &mut units);
            }
        }
        self.reclaim_units(units, dry_run, cancel)
    }

    fn plan_entry(&self, target: &Target, path: PathBuf, units: &mut Vec<PathBuf>) {
        let is_dir = std::fs::symlink_metadata(&path)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        if !is_dir || utils::is_windows_reparse_point(&path) || !target.shelters(&path) {
            units.push(path);
            return;
        }

        debug!(path = %path.display(), "holds excluded entries, reclaiming around them");
        for child in self.list(&path).unwrap_or_default() {
            if !target.is_excluded(&child) {
                self.plan_entry(target, child, units);
            }
        }
    }

    /// Immediate entries of `dir`, or `None` when it is missing or unreadable.
    fn list(&self, dir: &Path) -> Option<Vec<PathBuf>> {
        if dir.as_os_str().is_empty() || !dir.is_dir() {
            debug!(root = %dir.display(), "root missing, nothing to reclaim");
            return None;
        }
        match std::fs::read_dir(dir) {
            Ok(read_dir) => Some(
                read_dir
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .collect(),
            ),
            Err(err) => {
                warn!(root = %dir.display(), error = %err, "cannot list directory");
                self.log.emit(&format!("cannot list {}: {}", dir.display(), err));
                None
            }
        }
    }

    fn reclaim_units(
        &self,
        entries: Vec<PathBuf>,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> DirectoryTotals {
        if entries.is_empty() {
            return DirectoryTotals::default();
        }

        let totals = Mutex::new(DirectoryTotals::default());
        let process = |path: &PathBuf| {
            if cancel.is_cancelled() {
                return;
            }
            let attempt = reclaim_entry(self.ops.as_ref(), path, dry_run, &self.log);
            let mut guard = totals.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.fold(&attempt);
        };

        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.entry_workers)
            .thread_name(|i| format!("tempsweep-entry-{i}"))
            .build()
        {
            Ok(pool) => pool.install(|| entries.par_iter().for_each(process)),
            Err(err) => {
                warn!(error = %err, "entry pool unavailable, reclaiming sequentially");
                entries.iter().for_each(process);
            }
        }

        totals.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
