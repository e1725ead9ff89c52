//! Config command.

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::theme::Theme;
use anyhow::Context;

pub(crate) fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load();
            println!("{}", Theme::header("Current Configuration"));
            println!("{}", Theme::divider_bold(60));
            println!();
            println!("Engine:");
            println!("  Entry workers: {}", config.engine.entry_workers);
            println!("  Category workers: {} (0 = auto)", config.engine.category_workers);
            println!("  Browser grace: {} ms", config.engine.browser_grace_ms);
            println!();
            println!("Browser processes:");
            for name in &config.browsers.process_names {
                println!("  {}", name);
            }
            println!();
            println!("Exclusions:");
            if config.exclusions.patterns.is_empty() {
                println!("  (none)");
            } else {
                for pattern in &config.exclusions.patterns {
                    println!("  {}", pattern);
                }
            }
            println!();
            match Config::config_path() {
                Ok(path) if path.exists() => println!("Config file: {}", path.display()),
                Ok(path) => {
                    println!("Config file: {} (not created, using defaults)", path.display())
                }
                Err(err) => println!("Config file: unavailable ({err})"),
            }
        }
        ConfigAction::Path => {
            let path = Config::config_path().context("Failed to locate config file")?;
            println!("{}", path.display());
        }
        ConfigAction::Reset => {
            let path = Config::default()
                .save()
                .context("Failed to write default configuration")?;
            println!(
                "{} Configuration reset to defaults ({}).",
                Theme::success("OK"),
                path.display()
            );
        }
    }
    Ok(())
}
