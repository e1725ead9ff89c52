//! Task orchestrator.
//!
//! One unit of work per enabled category runs on a bounded pool. Units hand
//! their totals to the shared [`Aggregator`]; the caller thread only waits,
//! watches the cancellation token and finally runs the sequential post-phase
//! (DNS flush, then Recycle Bin, then memory trim).

use crate::cancel::CancellationToken;
use crate::categories::{Category, KnownFolders};
use crate::cleaner::{DirectoryTotals, LocalOps, ReclaimOps, Reclaimer};
use crate::config::{Config, ConfigError, EngineSettings};
use crate::logging::ProgressLog;
use crate::options::CleanupOptions;
use crate::result::{Aggregator, CleanupResult, PostActionOutcome};
use crate::system_actions::{OsActions, SystemActions};
use crate::targets::TargetResolver;
use bytesize::ByteSize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long in-flight units may keep running after cancellation before the
/// partial result is returned. Covers one directory backoff step.
///
/// Cancellation stops units from starting new targets or entries, but an entry
/// already inside its retry loop runs to completion. If that takes longer than
/// this, the run returns without it: the entry may still be deleted, and its
/// bytes are missing from the returned result.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub const FLUSH_DNS_ACTION: &str = "Flush DNS Cache";
pub const EMPTY_RECYCLE_BIN_ACTION: &str = "Empty Recycle Bin";
pub const TRIM_MEMORY_ACTION: &str = "Trim Memory";

pub struct Orchestrator {
    resolver: TargetResolver,
    ops: Arc<dyn ReclaimOps>,
    actions: Arc<dyn SystemActions>,
    log: ProgressLog,
    settings: EngineSettings,
    browser_processes: Vec<String>,
}

impl Orchestrator {
    pub fn new(resolver: TargetResolver) -> Self {
        let defaults = Config::default();
        Self {
            resolver,
            ops: Arc::new(LocalOps),
            actions: Arc::new(OsActions),
            log: ProgressLog::disabled(),
            settings: defaults.engine,
            browser_processes: defaults.browsers.process_names,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self::new(TargetResolver::from_config(config)?)
            .with_settings(config.engine.clone())
            .with_browser_processes(config.browsers.process_names.clone()))
    }

    pub fn with_ops(mut self, ops: Arc<dyn ReclaimOps>) -> Self {
        self.ops = ops;
        self
    }

    pub fn with_actions(mut self, actions: Arc<dyn SystemActions>) -> Self {
        self.actions = actions;
        self
    }

    /// Progress sink; only used when the run's options ask for verbose output.
    pub fn with_log(mut self, log: ProgressLog) -> Self {
        self.log = log;
        self
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_browser_processes(mut self, names: Vec<String>) -> Self {
        self.browser_processes = names;
        self
    }

    pub fn resolver(&self) -> &TargetResolver {
        &self.resolver
    }

    /// Run every enabled category, then the post-phase.
    ///
    /// Never fails: entry and category failures are counted or logged, and
    /// cancellation yields the partial result with `cancelled` set.
    pub fn run_cleanup(
        &self,
        options: &CleanupOptions,
        cancel: &CancellationToken,
    ) -> CleanupResult {
        let log = if options.verbose {
            self.log.clone()
        } else {
            ProgressLog::disabled()
        };
        let ctx = Arc::new(RunContext {
            resolver: self.resolver.clone(),
            reclaimer: Reclaimer::new(Arc::clone(&self.ops), log)
                .with_entry_workers(self.settings.entry_workers),
            actions: Arc::clone(&self.actions),
            aggregator: Aggregator::new(options.dry_run),
            options: options.clone(),
            cancel: cancel.clone(),
            browser_processes: self.browser_processes.clone(),
            browser_grace: Duration::from_millis(self.settings.browser_grace_ms),
            browsers_closed: Once::new(),
        });

        let categories = options.enabled_categories();
        info!(
            categories = categories.len(),
            dry_run = options.dry_run,
            "starting cleanup"
        );

        let completed = self.run_parallel_phase(&ctx, &categories);

        if cancel.is_cancelled() {
            warn!(completed, total = categories.len(), "cleanup interrupted");
            ctx.reclaimer.log().emit("cleanup interrupted, returning partial result");
            ctx.aggregator.mark_cancelled();
        } else {
            ctx.run_post_phase();
        }

        let result = ctx.aggregator.snapshot();
        info!(
            files = result.files_deleted,
            bytes = result.bytes_freed,
            cancelled = result.cancelled,
            "cleanup finished"
        );
        result
    }

    /// Returns the number of units that finished.
    fn run_parallel_phase(&self, ctx: &Arc<RunContext>, categories: &[Category]) -> usize {
        if categories.is_empty() {
            return 0;
        }

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.category_workers)
            .thread_name(|i| format!("tempsweep-category-{i}"))
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                warn!(error = %err, "category pool unavailable, running sequentially");
                for category in categories {
                    ctx.run_unit_isolated(*category);
                }
                return categories.len();
            }
        };

        let (tx, rx) = mpsc::channel::<Category>();
        for category in categories.iter().copied() {
            let tx = tx.clone();
            let ctx = Arc::clone(ctx);
            pool.spawn(move || {
                ctx.run_unit_isolated(category);
                let _ = tx.send(category);
            });
        }
        drop(tx);

        let mut finished = 0;
        let mut drain_deadline: Option<Instant> = None;
        while finished < categories.len() {
            match rx.recv_timeout(POLL_INTERVAL) {
                Ok(category) => {
                    debug!(category = category.id(), "unit finished");
                    finished += 1;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            if ctx.cancel.is_cancelled() {
                let deadline =
                    *drain_deadline.get_or_insert_with(|| Instant::now() + DRAIN_TIMEOUT);
                if Instant::now() >= deadline {
                    warn!(
                        pending = categories.len() - finished,
                        "units still running after cancellation, not waiting further"
                    );
                    break;
                }
            }
        }
        finished
    }
}

/// State shared by the units of one run.
struct RunContext {
    resolver: TargetResolver,
    reclaimer: Reclaimer,
    actions: Arc<dyn SystemActions>,
    aggregator: Aggregator,
    options: CleanupOptions,
    cancel: CancellationToken,
    browser_processes: Vec<String>,
    browser_grace: Duration,
    browsers_closed: Once,
}

impl RunContext {
    fn run_unit_isolated(&self, category: Category) {
        let outcome =
            std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.run_unit(category)));
        if outcome.is_err() {
            warn!(category = category.id(), "category unit panicked, siblings unaffected");
            self.reclaimer
                .log()
                .emit(&format!("{} failed unexpectedly", category.label()));
        }
    }

    fn run_unit(&self, category: Category) {
        if self.cancel.is_cancelled() {
            debug!(category = category.id(), "cancelled before start");
            return;
        }

        let log = self.reclaimer.log();
        info!(category = category.id(), "category started");
        log.emit(&format!("cleaning {}", category.label()));

        if category.is_browser() && self.options.close_browsers && !self.options.dry_run {
            self.browsers_closed.call_once(|| self.close_browsers());
        }

        self.aggregator.ensure_category(category);
        let mut totals = DirectoryTotals::default();
        for target in self.resolver.targets_for(category) {
            if self.cancel.is_cancelled() {
                break;
            }
            debug!(category = category.id(), root = %target.root.display(), "reclaiming target");
            let target_totals = self
                .reclaimer
                .reclaim_target(&target, self.options.dry_run, &self.cancel);
            self.aggregator.add(category, target_totals);
            totals.merge(target_totals);
        }

        info!(
            category = category.id(),
            files = totals.files_deleted,
            bytes = totals.bytes_freed,
            failed = totals.failed_entries,
            "category finished"
        );
        log.emit(&format!(
            "finished {}: {} entries, {}",
            category.label(),
            totals.files_deleted,
            ByteSize::b(totals.bytes_freed)
        ));
    }

    fn close_browsers(&self) {
        let closed = self.actions.close_processes(&self.browser_processes);
        if closed > 0 {
            self.reclaimer
                .log()
                .emit(&format!("closed {closed} browser process(es)"));
            std::thread::sleep(self.browser_grace);
        }
    }

    fn run_post_phase(&self) {
        let dry_run = self.options.dry_run;
        if self.options.flush_dns {
            let would = "flush the DNS resolver cache";
            let outcome =
                post_action(FLUSH_DNS_ACTION, dry_run, would, || self.actions.flush_dns());
            self.record(outcome);
        }
        if self.options.empty_recycle_bin {
            let would = "empty the Recycle Bin";
            let outcome = post_action(EMPTY_RECYCLE_BIN_ACTION, dry_run, would, || {
                self.actions
                    .empty_recycle_bin()
                    .map(|count| format!("Purged {count} item(s)"))
            });
            self.record(outcome);
        }
        if self.options.trim_memory {
            let would = "trim process working sets";
            let outcome =
                post_action(TRIM_MEMORY_ACTION, dry_run, would, || self.actions.trim_memory());
            self.record(outcome);
        }
    }

    fn record(&self, outcome: PostActionOutcome) {
        if outcome.succeeded {
            info!(action = %outcome.action, message = %outcome.message, "post action done");
        } else {
            warn!(action = %outcome.action, message = %outcome.message, "post action failed");
        }
        self.reclaimer
            .log()
            .emit(&format!("{}: {}", outcome.action, outcome.message));
        self.aggregator.record_action(outcome);
    }
}

fn post_action(
    action: &str,
    dry_run: bool,
    would: &str,
    run: impl FnOnce() -> anyhow::Result<String>,
) -> PostActionOutcome {
    if dry_run {
        return PostActionOutcome::skipped(action, &format!("Dry run mode - would {would}"));
    }
    match run() {
        Ok(message) => PostActionOutcome::success(action, message),
        Err(err) => PostActionOutcome::failure(action, format!("{err:#}")),
    }
}

/// Run a cleanup against the current user's folders with default settings.
pub fn run_cleanup(options: &CleanupOptions, cancel: &CancellationToken) -> CleanupResult {
    Orchestrator::new(TargetResolver::new(KnownFolders::from_env())).run_cleanup(options, cancel)
}
