//! `plugin-lib plan` - print the dependency load order

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use plugin_lib_api::render_error;
use plugin_lib_core::Resolution;
use plugin_lib_core::plugins::PluginFailure;

use super::build_loader;
use crate::config::HostConfig;

#[derive(Args)]
pub struct PlanArgs {
    /// Plugin root directory (defaults to the configured one)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub async fn run(args: PlanArgs, config: &HostConfig) -> Result<()> {
    let loader = build_loader(config, args.dir);
    let root = loader.config().plugin_dir.clone();

    let discovery = loader
        .discover(&root)
        .await
        .with_context(|| format!("Failed to read plugin directory {}", root.display()))?;
    let resolution = discovery.plan(|_| false);

    print!("{}", format_plan(&resolution, &discovery.failures));
    Ok(())
}

/// Numbered load order followed by everything that would not load
pub fn format_plan(resolution: &Resolution, skipped: &[PluginFailure]) -> String {
    let mut out = String::new();

    if resolution.order.is_empty() {
        out.push_str("Nothing to load\n");
    } else {
        out.push_str("Load order:\n");
        for (i, name) in resolution.order.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, name));
        }
    }

    if !resolution.rejected.is_empty() || !skipped.is_empty() {
        out.push_str("\nNot loadable:\n");
        for failure in skipped {
            out.push_str(&format!(
                "  ✗ {}: {}\n",
                failure.plugin,
                render_error(&failure.error)
            ));
        }
        for rejection in &resolution.rejected {
            let plugin = rejection.plugin.clone();
            let error = rejection.clone().into_error();
            out.push_str(&format!("  ✗ {}: {}\n", plugin, render_error(&error)));
        }
    }

    out
}
