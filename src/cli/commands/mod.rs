pub mod list;
pub mod recipe;
pub mod render;
pub mod run;

pub use list::{ListCommand, list_command};
pub use recipe::{RecipeCommand, recipe_command};
pub use render::{RenderCommand, render_command};
pub use run::{RunCommand, run_command};

use crate::processors::{Outcome, ProcessorOutput};
use clap::Args;
use colored::*;
use std::path::PathBuf;

/// Variable sources shared by every command that builds an environment
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// JSON or TOML file of input variables (repeatable, later files win)
    #[arg(short = 'e', long = "env", value_name = "FILE")]
    pub env_files: Vec<PathBuf>,

    /// Set one variable, e.g. --set category_name=Browsers (repeatable)
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub assignments: Vec<String>,
}

pub(crate) fn outcome_label(outcome: Outcome) -> ColoredString {
    let label = outcome.to_string();
    match outcome {
        Outcome::Created | Outcome::Updated | Outcome::Sent => label.bright_green().bold(),
        Outcome::Deleted => label.yellow().bold(),
        Outcome::Unchanged | Outcome::Absent | Outcome::NothingToReport => label.dimmed(),
    }
}

pub(crate) fn print_output(processor: &str, output: &ProcessorOutput) {
    let id = output
        .object_id
        .as_deref()
        .map(|id| format!(" (id {})", id))
        .unwrap_or_default();
    println!("✅ {}: {}{}", processor.cyan(), outcome_label(output.outcome), id);

    for (key, value) in &output.variables {
        // secrets are only shown with --json
        if key.contains("secret") {
            println!("   {} = {}", key.dimmed(), "********".dimmed());
        } else {
            println!("   {} = {}", key.dimmed(), value);
        }
    }
}
