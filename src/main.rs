use anyhow::{Context, Result};
use clap::Parser;
use log::{LevelFilter, debug, info};

use jamf_uploader::cli::{Cli, Commands};
use jamf_uploader::cli::commands::{list_command, recipe_command, render_command, run_command};
use jamf_uploader::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env only fills variables that are not already set
    let dotenv = dotenvy::dotenv();

    let config = Config::load(cli.config.as_deref())?;
    init_logging(&cli, &config)?;
    info!("Starting jamf-uploader");
    if let Ok(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }
    debug!("Config: {} seed variable(s)", config.variables.len());

    match cli.command {
        Commands::Run(args) => run_command(args, &config).await,
        Commands::Recipe(args) => recipe_command(args, &config).await,
        Commands::Render(args) => render_command(args, &config).await,
        Commands::List(args) => list_command(args).await,
    }
}

/// `-v` wins over the config file; `RUST_LOG` wins over both
fn init_logging(cli: &Cli, config: &Config) -> Result<()> {
    let level = match cli.verbose {
        0 => config.log_level().unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    builder.parse_default_env();

    if let Some(path) = &cli.log_file {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(log_file)));
    }

    builder.init();
    Ok(())
}
