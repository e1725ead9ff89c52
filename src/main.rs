use anyhow::Result;
use tempsweep::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run()
}
