//! Plan command - show how a config renders
//!
//! Prints the replacement mode and passes each camera configuration would
//! get, followed by the masking sub-draws every split pass issues.

use anyhow::{Context, Result};
use clap::Args;
use decalforge_core::camera::{ModeInputs, RenderingPath, TargetLayout, select_mode};
use decalforge_core::pipeline::{MaskPassPlan, TagMatch, logical_passes};
use decalforge_shared::{LayerMask, ProjectorConfig};
use std::fmt::Write;
use std::path::PathBuf;

/// Arguments for the plan command
#[derive(Args)]
pub struct PlanArgs {
    /// Path to the config file
    #[arg(default_value = "decalforge.toml")]
    pub config: PathBuf,
}

/// Execute the plan command
pub fn execute(args: PlanArgs) -> Result<()> {
    let config = ProjectorConfig::load(&args.config)
        .with_context(|| format!("Invalid config {}", args.config.display()))?;
    print!("{}", mode_table(&config));
    println!();
    print!("{}", sub_draws(&MaskPassPlan::build(config.mask_method, &config.masking_layers)));
    Ok(())
}

/// Mode and passes for every camera capability combination
pub fn mode_table(config: &ProjectorConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "replacement modes ({:?} override):",
        config.replacement_override
    );
    for path in [RenderingPath::Forward, RenderingPath::Deferred] {
        for stereo in [false, true] {
            for max_render_targets in [1, 4] {
                let mode = select_mode(&ModeInputs {
                    replacement_override: config.replacement_override,
                    stereo,
                    path,
                    max_render_targets,
                });
                let passes: Vec<String> = logical_passes(&TargetLayout::new(mode, path))
                    .iter()
                    .map(|p| {
                        let split = if p.split { "*" } else { "" };
                        format!("{:?}{split}", p.shader)
                    })
                    .collect();
                let _ = writeln!(
                    out,
                    "  {:<9} stereo={:<5} mrt={} -> {:<12} [{}]",
                    format!("{path:?}"),
                    stereo,
                    max_render_targets,
                    format!("{mode:?}"),
                    passes.join(", ")
                );
            }
        }
    }
    let _ = writeln!(out, "  (* split per masking sub-draw)");
    out
}

/// One line per sub-draw: mask vector and the surfaces it covers
pub fn sub_draws(plan: &MaskPassPlan) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "masking sub-draws ({:?}): {}",
        plan.method(),
        plan.sub_draws().len()
    );
    for (i, sub) in plan.sub_draws().iter().enumerate() {
        let v = sub.mask_layers;
        let clauses: Vec<String> = sub
            .filter
            .clauses()
            .iter()
            .map(|c| format!("{} {}", describe_layers(c.layers), describe_tags(&c.tags)))
            .collect();
        let _ = writeln!(
            out,
            "  [{i}] mask ({}, {}, {}, {}) <- {}",
            v.x,
            v.y,
            v.z,
            v.w,
            clauses.join(" | ")
        );
    }
    out
}

fn describe_layers(mask: LayerMask) -> String {
    if mask == LayerMask::ALL {
        "all layers".to_string()
    } else {
        let layers: Vec<String> = mask.iter().map(|l| l.to_string()).collect();
        format!("layers {{{}}}", layers.join(","))
    }
}

fn describe_tags(tags: &TagMatch) -> String {
    match tags {
        TagMatch::Any => "any tag".to_string(),
        TagMatch::Exactly(tag) => format!("tag {tag}"),
        TagMatch::NoneOf(list) if list.is_empty() => "any tag".to_string(),
        TagMatch::NoneOf(list) => format!("untagged or not in {list:?}"),
    }
}
