//! Clean command.
//!
//! Shows the preview totals, asks for approval, then runs the orchestrator.

use crate::cancel::CancellationToken;
use crate::cli::{read_line_from_stdin, CleanArgs};
use crate::config::Config;
use crate::logging::{ProgressLog, Verbosity};
use crate::orchestrator::Orchestrator;
use crate::output;
use crate::progress;
use crate::report;
use crate::theme::Theme;
use anyhow::Context;
use bytesize::ByteSize;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub(crate) fn handle_clean(args: CleanArgs, verbosity: Verbosity) -> anyhow::Result<()> {
    let options = args.to_options(verbosity >= Verbosity::Verbose);
    if options.enabled_categories().is_empty() && !options.has_post_actions() {
        eprintln!("No categories specified.");
        eprintln!("Use --all or pick categories like --user-temp, --browser-cache");
        eprintln!("Run 'tempsweep clean --help' for more information.");
        return Ok(());
    }

    let mut config = Config::load();
    config.apply_cli_overrides(None, &args.exclude);
    let orchestrator = Orchestrator::from_config(&config).context("Invalid exclusion pattern")?;
    let interactive = !args.json && verbosity != Verbosity::Quiet;

    if !args.yes && !options.dry_run {
        let spinner = progress::maybe_spinner(interactive, "Scanning...");
        let preview =
            report::build_report(orchestrator.resolver(), &options, &CancellationToken::new());
        spinner.finish_and_clear();

        if preview.is_empty() && !options.has_post_actions() {
            if !args.json {
                println!("{}", Theme::success("Nothing to clean."));
            }
            return Ok(());
        }

        if !args.json {
            output::print_preview(&preview, 0);
        }
        // stderr keeps `--json` output on stdout parseable.
        eprint!(
            "Delete {} entries ({})? [y/N]: ",
            preview.top_level_items(),
            ByteSize::b(preview.total_bytes())
        );
        let answer = read_line_from_stdin().context("Failed to read confirmation")?;
        if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
            eprintln!("{}", Theme::muted("Cancelled."));
            return Ok(());
        }
    }

    let spinner = progress::maybe_spinner(interactive, "Cleaning...");
    let sink_spinner = spinner.clone();
    let log = ProgressLog::new(options.verbose, move |line| {
        if sink_spinner.is_hidden() {
            eprintln!("{}", Theme::muted(line));
        } else {
            sink_spinner.println(Theme::muted(line));
        }
    });

    let cancel = CancellationToken::new();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let watchdog = args.max_duration.map(|secs| {
        let cancel = cancel.clone();
        thread::spawn(move || {
            // A closed channel means the run finished first.
            let outcome = done_rx.recv_timeout(Duration::from_secs(secs));
            if let Err(mpsc::RecvTimeoutError::Timeout) = outcome {
                tracing::warn!(seconds = secs, "time limit reached, cancelling");
                cancel.cancel();
            }
        })
    });

    let result = orchestrator.with_log(log).run_cleanup(&options, &cancel);
    drop(done_tx);
    if let Some(handle) = watchdog {
        let _ = handle.join();
    }
    spinner.finish_and_clear();

    if args.json {
        println!("{}", output::result_json(&result)?);
    } else if verbosity != Verbosity::Quiet {
        output::print_result(&result);
    }
    Ok(())
}
