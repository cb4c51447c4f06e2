use super::{EnvArgs, print_output};
use crate::config::Config;
use crate::processors::{ProcessorContext, ProcessorKind};
use anyhow::{Context, Result};
use clap::Args;
use colored::*;

#[derive(Args)]
pub struct RunCommand {
    /// Processor to run, e.g. JamfCategoryUploader or category-uploader
    pub processor: ProcessorKind,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Print the processor output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run_command(args: RunCommand, config: &Config) -> Result<()> {
    let env = config.build_environment(&args.env.env_files, &args.env.assignments)?;
    let processor = args
        .processor
        .build(&env)
        .with_context(|| format!("{} has invalid input", args.processor))?;

    if !args.json {
        println!("🚀 Running {}", processor.name().bright_blue().bold());
    }

    let context = ProcessorContext::new(env);
    let output = processor
        .run(&context)
        .await
        .with_context(|| format!("{} failed", processor.name()))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(processor.name(), &output);
    }
    Ok(())
}
