//! Logging for tempsweep.
//!
//! Two layers live here:
//! - the `tracing` subscriber installed by the binary (diagnostics on stderr)
//! - [`ProgressLog`], the human-readable progress sink handed to the engine
//!
//! Filter priority for the subscriber: `TEMPSWEEP_LOG` > `RUST_LOG` > CLI flags.

use std::sync::{Arc, Mutex};
use tracing::Level;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Verbosity derived from `-v`/`-q`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Debug,
}

impl Verbosity {
    pub fn from_flags(verbose: u8, quiet: bool) -> Self {
        match (verbose, quiet) {
            (0, true) => Self::Quiet,
            (0, false) => Self::Normal,
            (1, _) => Self::Verbose,
            _ => Self::Debug,
        }
    }

    pub fn default_level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::INFO,
            Self::Debug => Level::DEBUG,
        }
    }
}

/// Install the global subscriber. Safe to call twice; the second call is ignored.
pub fn init_subscriber(verbosity: Verbosity, no_color: bool) {
    let filter = build_env_filter(verbosity);
    let use_ansi = !no_color && std::io::IsTerminal::is_terminal(&std::io::stderr());

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(use_ansi)
        .with_target(verbosity == Verbosity::Debug)
        .without_time()
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

fn build_env_filter(verbosity: Verbosity) -> EnvFilter {
    if let Ok(directives) = std::env::var("TEMPSWEEP_LOG") {
        if let Ok(filter) = EnvFilter::try_new(&directives) {
            return filter;
        }
    }

    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = verbosity.default_level();
    EnvFilter::try_new(level.as_str()).unwrap_or_else(|_| EnvFilter::new("warn"))
}

type SinkFn = Box<dyn FnMut(&str) + Send>;

/// Progress sink for notable engine events (category start, entry deleted,
/// entry skipped, errors).
///
/// Cloning shares the same callback. Calls are serialized by a mutex so a
/// callback never sees interleaved lines. When built disabled every call is a
/// no-op.
#[derive(Clone, Default)]
pub struct ProgressLog {
    sink: Option<Arc<Mutex<SinkFn>>>,
}

impl ProgressLog {
    /// A sink that is active only when `verbose` is set.
    pub fn new<F>(verbose: bool, sink: F) -> Self
    where
        F: FnMut(&str) + Send + 'static,
    {
        if !verbose {
            return Self::disabled();
        }
        Self {
            sink: Some(Arc::new(Mutex::new(Box::new(sink)))),
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit(&self, message: &str) {
        if let Some(sink) = &self.sink {
            let mut callback = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            callback(message);
        }
    }
}

impl std::fmt::Debug for ProgressLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressLog")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
