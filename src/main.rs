use anyhow::Result;
use clap::Parser;
use analysis_sweep::cli::{Cli, Commands};
use analysis_sweep::{commands, formatting, observability};

fn main() -> Result<()> {
    // A missing .env is fine; the environment may already carry the token.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    formatting::color_mode(cli.global.plain).apply();
    observability::init_logging(cli.global.verbosity, cli.global.quiet);

    let config_path = cli.global.config;
    match cli.command {
        None => {
            commands::run_sweep(&config_path, &cli.run)?;
        }
        Some(Commands::Discover) => commands::discover_repos(&config_path)?,
        Some(Commands::Status { registry }) => commands::show_status(&config_path, registry)?,
        Some(Commands::Init { force }) => commands::init_config(&config_path, force)?,
    }
    Ok(())
}
