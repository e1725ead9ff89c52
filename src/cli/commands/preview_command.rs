//! Preview command.
//!
//! Runs the report scanner over the selected categories and prints what a
//! cleanup would remove. Never touches the filesystem.

use crate::cancel::CancellationToken;
use crate::cli::PreviewArgs;
use crate::config::Config;
use crate::logging::Verbosity;
use crate::options::CleanupOptions;
use crate::output;
use crate::progress;
use crate::report;
use crate::targets::TargetResolver;
use anyhow::Context;

pub(crate) fn handle_preview(args: PreviewArgs, verbosity: Verbosity) -> anyhow::Result<()> {
    let mut options = CleanupOptions::default();
    args.categories.apply(&mut options);
    if options.enabled_categories().is_empty() {
        eprintln!("No categories specified.");
        eprintln!("Use --all or pick categories like --user-temp, --browser-cache");
        eprintln!("Run 'tempsweep preview --help' for more information.");
        return Ok(());
    }

    let mut config = Config::load();
    config.apply_cli_overrides(None, &args.exclude);
    let resolver = TargetResolver::from_config(&config).context("Invalid exclusion pattern")?;

    let interactive = !args.json && verbosity != Verbosity::Quiet;
    let spinner = progress::maybe_spinner(interactive, "Scanning...");
    let report = report::build_report(&resolver, &options, &CancellationToken::new());
    spinner.finish_and_clear();

    if args.json {
        println!("{}", output::preview_json(&report, verbosity >= Verbosity::Verbose)?);
    } else if verbosity != Verbosity::Quiet {
        output::print_preview(&report, args.limit);
    }
    Ok(())
}
