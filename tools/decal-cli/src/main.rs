//! Decalforge CLI - Inspect projector configurations
//!
//! # Commands
//!
//! - `decalforge init` - Write a default decalforge.toml
//! - `decalforge check` - Validate a config and print pool capacities
//! - `decalforge plan` - Print replacement modes and masking sub-draws
//!
//! # Config (decalforge.toml)
//!
//! ```toml
//! mask_method = "Layer"
//! replacement_override = "Standard"
//!
//! [[masking_layers]]
//! name = "Environment"
//! layers = [0, 4]
//! tags = []
//!
//! [[pools]]
//! name = "Impacts"
//! capacities = [50, 150, 300]
//! ```

mod check;
mod init;
mod plan;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Decalforge CLI - Inspect projector configurations
#[derive(Parser)]
#[command(name = "decalforge")]
#[command(about = "Inspect decalforge projector configurations")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default decalforge.toml
    Init(init::InitArgs),

    /// Validate a config and print pool capacities per quality tier
    Check(check::CheckArgs),

    /// Print the replacement mode table and masking sub-draws
    Plan(plan::PlanArgs),
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init::execute(args),
        Commands::Check(args) => check::execute(args),
        Commands::Plan(args) => plan::execute(args),
    }
}
