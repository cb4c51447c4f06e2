use super::{EnvArgs, print_output};
use crate::config::Config;
use crate::recipe::{Recipe, run_recipe};
use anyhow::Result;
use clap::Args;
use colored::*;
use std::path::PathBuf;

#[derive(Args)]
pub struct RecipeCommand {
    /// Recipe file (TOML)
    pub path: PathBuf,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Print every step's output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn recipe_command(args: RecipeCommand, config: &Config) -> Result<()> {
    let recipe = Recipe::load(&args.path)?;
    let env = config.build_environment(&args.env.env_files, &args.env.assignments)?;

    if !args.json {
        println!("📄 Recipe: {}", args.path.display().to_string().cyan());
        if let Some(description) = &recipe.description {
            println!("   {}", description.dimmed());
        }
        println!();
    }

    let run = run_recipe(&recipe, env, None).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&run.steps)?);
        return Ok(());
    }

    for step in &run.steps {
        print_output(step.processor.jamf_name(), &step.output);
    }
    println!();
    println!(
        "🏁 {} step(s) completed, {} changed",
        run.steps.len().to_string().bold(),
        run.steps.iter().filter(|s| s.output.changed()).count().to_string().bright_green()
    );
    Ok(())
}
