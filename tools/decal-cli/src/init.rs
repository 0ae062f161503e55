//! Init command - write a default config

use anyhow::{Context, Result};
use clap::Args;
use decalforge_shared::ProjectorConfig;
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Args)]
pub struct InitArgs {
    /// Output path
    #[arg(default_value = "decalforge.toml")]
    pub path: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

/// Execute the init command
pub fn execute(args: InitArgs) -> Result<()> {
    if args.path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            args.path.display()
        );
    }

    let contents = ProjectorConfig::default().to_toml_string()?;
    std::fs::write(&args.path, contents)
        .with_context(|| format!("Failed to write {}", args.path.display()))?;

    tracing::info!(path = %args.path.display(), "wrote default config");
    println!("Created {}", args.path.display());
    Ok(())
}
