//! Reclamation engine.
//!
//! - `probe`: entry classification and size probe
//! - `lock`: advisory lock test
//! - `ops`: filesystem capability seam (`ReclaimOps`) and error classification
//! - `retry`: per-entry delete-with-retry state machine
//! - `directory`: bounded-parallel directory reclaimer

mod directory;
mod lock;
mod ops;
mod probe;
mod retry;

pub use directory::{DirectoryTotals, Reclaimer, DEFAULT_ENTRY_WORKERS};
pub use lock::is_locked;
pub use ops::{
    classify, schedule_delete_on_restart, schedule_tree_on_restart, ErrorClass, LocalOps,
    ReclaimOps,
};
pub use probe::{directory_size, probe, EntryKind, Probe, ProbeError};
pub use retry::{
    reclaim_entry, run_retry_loop, ReclaimAttempt, ReclaimOutcome, RetryPolicy, Transition,
};
