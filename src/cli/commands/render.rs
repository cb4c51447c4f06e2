use super::EnvArgs;
use crate::config::Config;
use crate::template;
use anyhow::{Context, Result};
use clap::Args;
use colored::*;
use std::fs;
use std::path::PathBuf;

#[derive(Args)]
pub struct RenderCommand {
    /// Template file
    pub template: PathBuf,

    #[command(flatten)]
    pub env: EnvArgs,

    /// Escape substituted values for XML
    #[arg(long)]
    pub xml_escape: bool,
}

pub async fn render_command(args: RenderCommand, config: &Config) -> Result<()> {
    let env = config.build_environment(&args.env.env_files, &args.env.assignments)?;
    let content = fs::read_to_string(&args.template)
        .with_context(|| format!("Failed to read template: {}", args.template.display()))?;

    let rendered = template::render_detailed(&content, &env, args.xml_escape);
    println!("{}", rendered.text);

    if !rendered.unresolved.is_empty() {
        eprintln!(
            "⚠️  {} {}",
            "Unresolved placeholders:".yellow(),
            rendered.unresolved.join(", ")
        );
    }
    Ok(())
}
