use crate::api::endpoints::ObjectType;
use crate::processors::ProcessorKind;
use anyhow::Result;
use clap::Args;
use colored::*;

#[derive(Args)]
pub struct ListCommand {
    /// Also list the object types accepted by object_type
    #[arg(long)]
    pub object_types: bool,
}

pub async fn list_command(args: ListCommand) -> Result<()> {
    println!("{}", "Processors".bold());
    for kind in ProcessorKind::ALL {
        println!(
            "  {:<32} {:<30} {}",
            kind.jamf_name().bright_blue(),
            kind.cli_name().dimmed(),
            kind.description()
        );
    }

    if args.object_types {
        println!();
        println!("{}", "Object types".bold());
        for object_type in ObjectType::ALL {
            println!("  {:<30} {}", object_type.as_str().cyan(), object_type.path().dimmed());
        }
    }
    Ok(())
}
