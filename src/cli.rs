use crate::categories::Category;
use crate::logging::{self, Verbosity};
use crate::options::CleanupOptions;
use crate::theme::Theme;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::{self, BufRead, Write};

pub mod commands;

/// Read one line from stdin after flushing the prompt.
///
/// A fresh stdin handle is taken on every call; on Windows a console that lost
/// and regained focus can leave a previously locked handle stale.
pub(crate) fn read_line_from_stdin() -> io::Result<String> {
    io::stdout().flush()?;
    let mut input = String::new();
    let stdin = io::stdin();
    let mut handle = stdin.lock();
    handle.read_line(&mut input)?;
    Ok(input)
}

#[derive(Parser)]
#[command(name = "tempsweep")]
#[command(version)]
#[command(about = "Reclaim disk space from temp folders, caches and other transient data")]
#[command(
    long_about = "tempsweep deletes transient data (temp folders, browser caches, update \
    caches, thumbnails, ...) with lock-tolerant retries.\n\n\
    Examples:\n  \
    tempsweep preview --all                 # What would be removed\n  \
    tempsweep clean --user-temp --dry-run   # Count without deleting\n  \
    tempsweep clean --all --close-browsers  # Clean everything, asking first\n  \
    tempsweep config show                   # Print the effective configuration"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase output verbosity (-v, -vv for more)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show what a cleanup would remove (read-only)
    #[command(visible_alias = "p")]
    Preview(PreviewArgs),

    /// Delete transient data (asks for confirmation)
    #[command(visible_alias = "c")]
    Clean(CleanArgs),

    /// View or reset configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the config file location
    Path,
    /// Overwrite the config file with defaults
    Reset,
}

/// Category switches shared by `preview` and `clean`.
#[derive(Args, Debug, Clone, Default)]
pub struct CategoryArgs {
    /// Enable every category
    #[arg(short = 'a', long)]
    pub all: bool,

    /// %SystemRoot%\Temp
    #[arg(long)]
    pub system_temp: bool,

    /// %TEMP% and %LOCALAPPDATA%\Temp
    #[arg(long)]
    pub user_temp: bool,

    /// Browser disk caches (Chrome, Edge, Brave, Vivaldi, Opera, Firefox)
    #[arg(long)]
    pub browser_cache: bool,

    /// Chromium-family browsing history databases
    #[arg(long)]
    pub browser_history: bool,

    /// Windows Update and Delivery Optimization downloads
    #[arg(long)]
    pub windows_update: bool,

    /// Explorer thumbnail and icon caches
    #[arg(long)]
    pub thumbnails: bool,

    /// Prefetch trace files
    #[arg(long)]
    pub prefetch: bool,

    /// Windows Error Reporting queues and crash dumps
    #[arg(long)]
    pub error_reports: bool,

    /// CBS and Windows Update logs
    #[arg(long)]
    pub system_logs: bool,

    /// Application caches (Discord, VS Code, Slack, Teams, ...)
    #[arg(long)]
    pub app_cache: bool,

    /// Package manager caches (npm, pip, yarn, NuGet, ...)
    #[arg(long)]
    pub package_cache: bool,

    /// Desktop and Start Menu shortcuts whose target is gone
    #[arg(long)]
    pub orphaned_shortcuts: bool,
}

impl CategoryArgs {
    fn selected(&self) -> Vec<Category> {
        if self.all {
            return Category::ALL.to_vec();
        }
        let flags = [
            (Category::SystemTemp, self.system_temp),
            (Category::UserTemp, self.user_temp),
            (Category::BrowserCache, self.browser_cache),
            (Category::BrowserHistory, self.browser_history),
            (Category::WindowsUpdate, self.windows_update),
            (Category::Thumbnails, self.thumbnails),
            (Category::Prefetch, self.prefetch),
            (Category::ErrorReports, self.error_reports),
            (Category::SystemLogs, self.system_logs),
            (Category::AppCache, self.app_cache),
            (Category::PackageCache, self.package_cache),
            (Category::OrphanedShortcuts, self.orphaned_shortcuts),
        ];
        flags
            .into_iter()
            .filter(|(_, enabled)| *enabled)
            .map(|(category, _)| category)
            .collect()
    }

    /// Enable the selected categories on `options`.
    pub fn apply(&self, options: &mut CleanupOptions) {
        for category in self.selected() {
            options.set_category(category, true);
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub categories: CategoryArgs,

    /// Output results as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Number of largest items to list (0 hides the list)
    #[arg(long, default_value = "10", value_name = "N")]
    pub limit: usize,

    /// Exclude paths matching a glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub categories: CategoryArgs,

    /// Count what would be deleted without deleting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,

    /// Ask running browsers to exit before cleaning their caches
    #[arg(long)]
    pub close_browsers: bool,

    /// Flush the DNS resolver cache afterwards
    #[arg(long)]
    pub flush_dns: bool,

    /// Empty the Recycle Bin afterwards
    #[arg(long)]
    pub empty_recycle_bin: bool,

    /// Trim process working sets afterwards (Windows)
    #[arg(long)]
    pub trim_memory: bool,

    /// Output results as JSON for scripting
    #[arg(long)]
    pub json: bool,

    /// Stop after this many seconds and report what was done
    #[arg(long, value_name = "SECS")]
    pub max_duration: Option<u64>,

    /// Exclude paths matching a glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,
}

impl CleanArgs {
    pub fn to_options(&self, verbose: bool) -> CleanupOptions {
        let mut options = CleanupOptions {
            flush_dns: self.flush_dns,
            empty_recycle_bin: self.empty_recycle_bin,
            trim_memory: self.trim_memory,
            close_browsers: self.close_browsers,
            dry_run: self.dry_run,
            verbose,
            ..Default::default()
        };
        self.categories.apply(&mut options);
        options
    }
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }

    pub fn run(self) -> anyhow::Result<()> {
        let verbosity = self.verbosity();
        logging::init_subscriber(verbosity, self.no_color);
        if self.no_color {
            Theme::set_color(false);
        }

        match self.command {
            Commands::Preview(args) => commands::preview_command::handle_preview(args, verbosity),
            Commands::Clean(args) => commands::clean_command::handle_clean(args, verbosity),
            Commands::Config { action } => commands::config_command::handle_config(action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clean_flags_map_to_options() {
        let cli = Cli::try_parse_from([
            "tempsweep",
            "clean",
            "--user-temp",
            "--prefetch",
            "--flush-dns",
            "--dry-run",
            "--exclude",
            "**/keep/**",
        ])
        .unwrap();
        let Commands::Clean(args) = cli.command else {
            panic!("expected clean");
        };
        let options = args.to_options(false);
        assert_eq!(
            options.enabled_categories(),
            vec![Category::UserTemp, Category::Prefetch]
        );
        assert!(options.flush_dns);
        assert!(options.dry_run);
        assert_eq!(args.exclude, vec!["**/keep/**".to_string()]);
    }

    #[test]
    fn test_all_enables_every_category() {
        let cli = Cli::try_parse_from(["tempsweep", "preview", "--all", "--json"]).unwrap();
        let Commands::Preview(args) = cli.command else {
            panic!("expected preview");
        };
        let mut options = CleanupOptions::default();
        args.categories.apply(&mut options);
        assert_eq!(options.enabled_categories().len(), Category::ALL.len());
        assert!(args.json);
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["tempsweep", "-vv", "config", "path"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Debug);
        assert!(Cli::try_parse_from(["tempsweep", "-q", "-v", "config", "show"]).is_err());
    }
}
