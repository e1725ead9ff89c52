//! Delete-with-retry state machine for a single filesystem entry.
//!
//! ```text
//! Attempting -> Succeeded
//!            -> LockedBackoff -> Attempting
//!            -> DeferredScheduled        (attempts exhausted while busy)
//!            -> PermanentFailure
//! ```
//!
//! The policy ([`RetryPolicy`]) and the transition function
//! ([`RetryPolicy::transition`]) are pure, so the backoff schedule and exit
//! conditions are testable without a locked file.

use super::ops::{classify, ErrorClass, ReclaimOps};
use super::probe::{EntryKind, ProbeError};
use crate::logging::ProgressLog;
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Attempt budget and exponential backoff for one entry kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const FILE: RetryPolicy = RetryPolicy {
        max_attempts: 8,
        initial_delay: Duration::from_millis(50),
        max_delay: Duration::from_millis(1000),
    };

    pub const DIRECTORY: RetryPolicy = RetryPolicy {
        max_attempts: 6,
        initial_delay: Duration::from_millis(150),
        max_delay: Duration::from_millis(2500),
    };

    pub fn for_kind(kind: EntryKind) -> Self {
        match kind {
            EntryKind::File => Self::FILE,
            EntryKind::Directory => Self::DIRECTORY,
        }
    }

    /// Doubling delay, capped at `max_delay`.
    pub fn next_delay(&self, delay: Duration) -> Duration {
        delay.saturating_mul(2).min(self.max_delay)
    }

    /// Sleeps taken between attempts when every attempt reports busy.
    pub fn backoff_schedule(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay;
        for _ in 1..self.max_attempts {
            delays.push(delay);
            delay = self.next_delay(delay);
        }
        delays
    }

    /// Decide what follows attempt number `attempt` (1-based).
    pub fn transition(&self, attempt: u32, delay: Duration, result: &io::Result<()>) -> Transition {
        let err = match result {
            Ok(()) => return Transition::Succeeded,
            Err(err) => err,
        };
        match classify(err) {
            ErrorClass::NotFound => Transition::Vanished,
            ErrorClass::Busy if attempt >= self.max_attempts => Transition::Exhausted,
            ErrorClass::Busy => Transition::Backoff(delay),
            ErrorClass::PermissionDenied => Transition::Abort(ErrorClass::PermissionDenied),
            ErrorClass::Other => Transition::Abort(ErrorClass::Other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Succeeded,
    /// Entry disappeared underneath us.
    Vanished,
    /// Busy: sleep for the given delay, then try again.
    Backoff(Duration),
    /// Busy on the final attempt.
    Exhausted,
    Abort(ErrorClass),
}

/// Final outcome of one reclaim attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclaimOutcome {
    Deleted,
    /// Dry run: the entry would have been deleted.
    WouldDelete,
    /// Still on disk, but the OS will remove it at next restart.
    DeferredOnRestart,
    /// The entry was already gone.
    Missing,
    LockedPermanent,
    PermissionDenied,
    Other,
}

impl ReclaimOutcome {
    /// Whether the entry counts toward files deleted / bytes freed.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ReclaimOutcome::Deleted
                | ReclaimOutcome::WouldDelete
                | ReclaimOutcome::DeferredOnRestart
        )
    }

    pub fn is_failure(self) -> bool {
        matches!(
            self,
            ReclaimOutcome::LockedPermanent
                | ReclaimOutcome::PermissionDenied
                | ReclaimOutcome::Other
        )
    }
}

/// Ephemeral per-entry record; drives aggregation and logging only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReclaimAttempt {
    pub path: PathBuf,
    pub kind: Option<EntryKind>,
    pub outcome: ReclaimOutcome,
    /// Size probed before deletion. Counted only on success.
    pub size: u64,
}

impl ReclaimAttempt {
    pub fn success(&self) -> bool {
        self.outcome.is_success()
    }

    pub fn bytes_freed(&self) -> u64 {
        if self.success() {
            self.size
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryState {
    Attempting { attempt: u32, delay: Duration, seen_busy: bool },
    LockedBackoff { attempt: u32, delay: Duration },
    DeferredScheduled,
    Finished(ReclaimOutcome),
}

/// Reclaim one entry: probe it, then delete with retries.
///
/// Never returns an error. Every failure mode ends up in
/// [`ReclaimAttempt::outcome`].
pub fn reclaim_entry(
    ops: &dyn ReclaimOps,
    path: &Path,
    dry_run: bool,
    log: &ProgressLog,
) -> ReclaimAttempt {
    let probe = match ops.probe(path) {
        Ok(probe) => probe,
        Err(ProbeError::NotFound(_)) => {
            debug!(path = %path.display(), "entry vanished before reclaim");
            return ReclaimAttempt {
                path: path.to_path_buf(),
                kind: None,
                outcome: ReclaimOutcome::Missing,
                size: 0,
            };
        }
        Err(err) => {
            warn!(error = %err, "could not probe entry");
            log.emit(&format!("skipped {}: {}", path.display(), err));
            return ReclaimAttempt {
                path: path.to_path_buf(),
                kind: None,
                outcome: ReclaimOutcome::Other,
                size: 0,
            };
        }
    };

    if dry_run {
        log.emit(&format!("would delete {} ({} bytes)", path.display(), probe.size));
        return ReclaimAttempt {
            path: path.to_path_buf(),
            kind: Some(probe.kind),
            outcome: ReclaimOutcome::WouldDelete,
            size: probe.size,
        };
    }

    let outcome = run_retry_loop(ops, path, probe.kind, RetryPolicy::for_kind(probe.kind), log);
    match outcome {
        ReclaimOutcome::Deleted => log.emit(&format!("deleted {}", path.display())),
        ReclaimOutcome::DeferredOnRestart => {
            log.emit(&format!("scheduled {} for deletion at restart", path.display()))
        }
        ReclaimOutcome::Missing => {}
        other => log.emit(&format!("skipped {} ({:?})", path.display(), other)),
    }

    ReclaimAttempt {
        path: path.to_path_buf(),
        kind: Some(probe.kind),
        outcome,
        size: probe.size,
    }
}

/// Drive the state machine until it reaches a final outcome.
pub fn run_retry_loop(
    ops: &dyn ReclaimOps,
    path: &Path,
    kind: EntryKind,
    policy: RetryPolicy,
    log: &ProgressLog,
) -> ReclaimOutcome {
    let mut state = RetryState::Attempting {
        attempt: 1,
        delay: policy.initial_delay,
        seen_busy: false,
    };

    loop {
        state = match state {
            RetryState::Attempting { attempt, delay, seen_busy } => {
                ops.clear_readonly(path, kind);
                let result = ops.remove(path, kind);
                match policy.transition(attempt, delay, &result) {
                    Transition::Succeeded => RetryState::Finished(ReclaimOutcome::Deleted),
                    Transition::Vanished if seen_busy => {
                        // Whoever held it removed it; the space is free either way.
                        RetryState::Finished(ReclaimOutcome::Deleted)
                    }
                    Transition::Vanished => RetryState::Finished(ReclaimOutcome::Missing),
                    Transition::Backoff(delay) => {
                        if ops.is_locked(path) {
                            debug!(path = %path.display(), attempt, "held open by another process");
                        } else {
                            debug!(path = %path.display(), attempt, "busy");
                        }
                        RetryState::LockedBackoff { attempt, delay }
                    }
                    Transition::Exhausted => RetryState::DeferredScheduled,
                    Transition::Abort(class) => {
                        let err_text = result
                            .err()
                            .map(|e| e.to_string())
                            .unwrap_or_default();
                        warn!(path = %path.display(), error = %err_text, "delete failed");
                        log.emit(&format!("error deleting {}: {}", path.display(), err_text));
                        RetryState::Finished(match class {
                            ErrorClass::PermissionDenied => ReclaimOutcome::PermissionDenied,
                            _ => ReclaimOutcome::Other,
                        })
                    }
                }
            }
            RetryState::LockedBackoff { attempt, delay } => {
                ops.pause(delay);
                RetryState::Attempting {
                    attempt: attempt + 1,
                    delay: policy.next_delay(delay),
                    seen_busy: true,
                }
            }
            RetryState::DeferredScheduled => {
                if ops.schedule_delete_on_restart(path, kind) {
                    debug!(path = %path.display(), "deferred to next restart");
                    RetryState::Finished(ReclaimOutcome::DeferredOnRestart)
                } else {
                    warn!(
                        path = %path.display(),
                        "still locked after {} attempts",
                        policy.max_attempts
                    );
                    RetryState::Finished(ReclaimOutcome::LockedPermanent)
                }
            }
            RetryState::Finished(outcome) => return outcome,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::ops::LocalOps;
    use crate::cleaner::probe::Probe;
    use std::fs;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[cfg(windows)]
    const BUSY: i32 = 32;
    #[cfg(not(windows))]
    const BUSY: i32 = 16;

    /// Reports a fixed error for the first `failures` removals.
    struct ScriptedOps {
        failures: u32,
        error: fn() -> io::Error,
        schedule_ok: bool,
        attempts: AtomicU32,
        pauses: Mutex<Vec<Duration>>,
    }

    impl ScriptedOps {
        fn new(failures: u32, error: fn() -> io::Error, schedule_ok: bool) -> Self {
            Self {
                failures,
                error,
                schedule_ok,
                attempts: AtomicU32::new(0),
                pauses: Mutex::new(Vec::new()),
            }
        }
    }

    impl ReclaimOps for ScriptedOps {
        fn probe(&self, _path: &Path) -> Result<Probe, ProbeError> {
            Ok(Probe {
                kind: EntryKind::File,
                size: 42,
            })
        }

        fn clear_readonly(&self, _path: &Path, _kind: EntryKind) {}

        fn remove(&self, _path: &Path, _kind: EntryKind) -> io::Result<()> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.failures {
                Err((self.error)())
            } else {
                Ok(())
            }
        }

        fn is_locked(&self, _path: &Path) -> bool {
            true
        }

        fn schedule_delete_on_restart(&self, _path: &Path, _kind: EntryKind) -> bool {
            self.schedule_ok
        }

        fn pause(&self, delay: Duration) {
            self.pauses.lock().unwrap().push(delay);
        }
    }

    fn busy() -> io::Error {
        io::Error::from_raw_os_error(BUSY)
    }

    fn denied() -> io::Error {
        io::Error::from(io::ErrorKind::PermissionDenied)
    }

    fn vanished() -> io::Error {
        io::Error::from(io::ErrorKind::NotFound)
    }

    #[test]
    fn test_file_backoff_schedule() {
        let ms: Vec<u64> = RetryPolicy::FILE
            .backoff_schedule()
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(ms, vec![50, 100, 200, 400, 800, 1000, 1000]);
    }

    #[test]
    fn test_directory_backoff_schedule() {
        let ms: Vec<u64> = RetryPolicy::DIRECTORY
            .backoff_schedule()
            .iter()
            .map(|d| d.as_millis() as u64)
            .collect();
        assert_eq!(ms, vec![150, 300, 600, 1200, 2400]);
    }

    #[test]
    fn test_transitions() {
        let policy = RetryPolicy::FILE;
        let d = policy.initial_delay;
        assert_eq!(policy.transition(1, d, &Ok(())), Transition::Succeeded);
        assert_eq!(policy.transition(1, d, &Err(busy())), Transition::Backoff(d));
        assert_eq!(policy.transition(8, d, &Err(busy())), Transition::Exhausted);
        assert_eq!(
            policy.transition(1, d, &Err(denied())),
            Transition::Abort(ErrorClass::PermissionDenied)
        );
        assert_eq!(policy.transition(1, d, &Err(vanished())), Transition::Vanished);
    }

    #[test]
    fn test_busy_then_success() {
        let ops = ScriptedOps::new(3, busy, false);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::Deleted);
        assert_eq!(attempt.bytes_freed(), 42);
        assert_eq!(ops.attempts.load(Ordering::SeqCst), 4);
        assert_eq!(
            *ops.pauses.lock().unwrap(),
            vec![
                Duration::from_millis(50),
                Duration::from_millis(100),
                Duration::from_millis(200)
            ]
        );
    }

    #[test]
    fn test_locked_forever_is_deferred_when_scheduling_succeeds() {
        let ops = ScriptedOps::new(u32::MAX, busy, true);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::DeferredOnRestart);
        assert!(attempt.success());
        assert_eq!(attempt.bytes_freed(), 42);
        assert_eq!(ops.attempts.load(Ordering::SeqCst), RetryPolicy::FILE.max_attempts);
        // No sleep after the final attempt.
        assert_eq!(ops.pauses.lock().unwrap().len(), 7);
    }

    #[test]
    fn test_locked_forever_without_scheduling_fails() {
        let ops = ScriptedOps::new(u32::MAX, busy, false);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::LockedPermanent);
        assert!(!attempt.success());
        assert_eq!(attempt.bytes_freed(), 0);
    }

    #[test]
    fn test_permission_denied_is_not_retried() {
        let ops = ScriptedOps::new(u32::MAX, denied, true);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::PermissionDenied);
        assert_eq!(ops.attempts.load(Ordering::SeqCst), 1);
        assert!(ops.pauses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_vanished_mid_delete_is_missing() {
        let ops = ScriptedOps::new(1, vanished, false);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::Missing);
        assert_eq!(attempt.bytes_freed(), 0);
    }

    /// Real directory that stays busy; restart scheduling refuses `held.bin`.
    struct BusyTreeOps;

    impl ReclaimOps for BusyTreeOps {
        fn clear_readonly(&self, _path: &Path, _kind: EntryKind) {}

        fn remove(&self, _path: &Path, _kind: EntryKind) -> io::Result<()> {
            Err(busy())
        }

        fn schedule_delete_on_restart(&self, path: &Path, kind: EntryKind) -> bool {
            let refuse_held = |p: &Path| !p.ends_with("held.bin");
            crate::cleaner::ops::schedule_tree_on_restart(path, kind, refuse_held)
        }

        fn pause(&self, _delay: Duration) {}
    }

    #[test]
    fn test_busy_directory_with_refused_child_is_not_counted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("cache");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("held.bin"), vec![0u8; 900]).unwrap();
        fs::write(dir.join("free.bin"), vec![0u8; 100]).unwrap();

        let attempt = reclaim_entry(&BusyTreeOps, &dir, false, &ProgressLog::disabled());
        assert_eq!(attempt.kind, Some(EntryKind::Directory));
        assert_eq!(attempt.outcome, ReclaimOutcome::LockedPermanent);
        assert_eq!(attempt.bytes_freed(), 0);
    }

    #[test]
    fn test_busy_directory_fully_scheduled_is_deferred() {
        let temp_dir = tempfile::tempdir().unwrap();
        let dir = temp_dir.path().join("cache");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("free.bin"), vec![0u8; 100]).unwrap();

        let attempt = reclaim_entry(&BusyTreeOps, &dir, false, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::DeferredOnRestart);
        assert_eq!(attempt.bytes_freed(), 100);
    }

    #[test]
    fn test_dry_run_never_removes() {
        let ops = ScriptedOps::new(0, busy, false);
        let attempt = reclaim_entry(&ops, Path::new("x.tmp"), true, &ProgressLog::disabled());
        assert_eq!(attempt.outcome, ReclaimOutcome::WouldDelete);
        assert_eq!(attempt.bytes_freed(), 42);
        assert_eq!(ops.attempts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_real_file_and_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("a.tmp");
        fs::write(&file, vec![0u8; 1024]).unwrap();
        let dir = temp_dir.path().join("sub");
        fs::create_dir_all(dir.join("deep")).unwrap();
        fs::write(dir.join("deep").join("b.tmp"), vec![0u8; 10]).unwrap();

        let log = ProgressLog::disabled();
        let a = reclaim_entry(&LocalOps, &file, false, &log);
        let b = reclaim_entry(&LocalOps, &dir, false, &log);
        assert_eq!((a.outcome, a.bytes_freed()), (ReclaimOutcome::Deleted, 1024));
        assert_eq!((b.outcome, b.bytes_freed()), (ReclaimOutcome::Deleted, 10));
        assert!(!file.exists());
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_entry_is_noop() {
        let temp_dir = tempfile::tempdir().unwrap();
        let attempt = reclaim_entry(
            &LocalOps,
            &temp_dir.path().join("gone"),
            false,
            &ProgressLog::disabled(),
        );
        assert_eq!(attempt.outcome, ReclaimOutcome::Missing);
        assert!(!attempt.success());
    }
}
