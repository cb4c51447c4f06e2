use super::commands::{ListCommand, RecipeCommand, RenderCommand, RunCommand};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "jamf-uploader")]
#[command(version)]
#[command(about = "Create, update and delete Jamf Pro objects and report the results")]
pub struct Cli {
    /// Config file (defaults to the per-user config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a single processor
    Run(RunCommand),
    /// Run a TOML recipe of processor steps
    Recipe(RecipeCommand),
    /// Render a template against the environment and print it
    Render(RenderCommand),
    /// List available processors
    List(ListCommand),
}
