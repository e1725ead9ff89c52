//! tempsweep library crate
//!
//! Concurrent reclamation of temp folders, caches and other transient data.
//! The CLI binary is a thin layer over this API:
//!
//! - [`targets::TargetResolver`] maps [`CleanupOptions`] to target folders
//! - [`report::build_report`] previews what a run would touch (read-only)
//! - [`orchestrator::Orchestrator`] runs the cleanup and returns a [`CleanupResult`]

pub mod cancel;
pub mod categories;
pub mod cleaner;
pub mod cli;
pub mod config;
pub mod logging;
pub mod options;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod report;
pub mod result;
pub mod system_actions;
pub mod targets;
pub mod theme;
pub mod trash_ops;
pub mod utils;

pub use cancel::CancellationToken;
pub use categories::{Category, KnownFolders};
pub use options::CleanupOptions;
pub use orchestrator::{run_cleanup, Orchestrator};
pub use report::{CleanupReport, ReportItem};
pub use result::CleanupResult;
