//! Check command - validate a config and summarize its pools

use anyhow::{Context, Result};
use clap::Args;
use decalforge_shared::ProjectorConfig;
use std::fmt::Write;
use std::path::PathBuf;

/// Arguments for the check command
#[derive(Args)]
pub struct CheckArgs {
    /// Path to the config file
    #[arg(default_value = "decalforge.toml")]
    pub config: PathBuf,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let config = ProjectorConfig::load(&args.config)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;
    print!("{}", summarize(&config));
    Ok(())
}

/// Human-readable summary of a validated config
pub fn summarize(config: &ProjectorConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mask method:          {:?}", config.mask_method);
    let _ = writeln!(out, "replacement override: {:?}", config.replacement_override);

    let _ = writeln!(out, "masking layers:       {}", config.masking_layers.len());
    for (i, masking) in config.masking_layers.iter().enumerate() {
        let _ = writeln!(
            out,
            "  [{i}] {:<16} layers {:?} tags {:?}",
            masking.name, masking.layers, masking.tags
        );
    }

    let tiers = config
        .pools
        .iter()
        .map(|p| p.capacities.len())
        .max()
        .unwrap_or(0);
    let _ = writeln!(out, "pools:                {} ({tiers} quality tiers)", config.pools.len());
    for pool in &config.pools {
        let capacities: Vec<String> = (0..tiers)
            .map(|tier| pool.capacity(tier).to_string())
            .collect();
        let _ = writeln!(out, "  {:<20} {}", pool.name, capacities.join(" / "));
    }
    out
}
