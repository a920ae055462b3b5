//! `plugin-lib run` - load plugins, enable them by phase, wait for Ctrl-C

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use plugin_lib_api::{LoadPhase, PluginState, render_error};
use plugin_lib_core::PluginLoader;

use super::build_loader;
use crate::config::HostConfig;

/// Which load phases to enable
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PhaseArg {
    Startup,
    Poststart,
    All,
}

impl PhaseArg {
    pub fn phases(self) -> &'static [LoadPhase] {
        match self {
            PhaseArg::Startup => &[LoadPhase::Startup],
            PhaseArg::Poststart => &[LoadPhase::PostStart],
            PhaseArg::All => &[LoadPhase::Startup, LoadPhase::PostStart],
        }
    }
}

#[derive(Args)]
pub struct RunArgs {
    /// Plugin root directory (defaults to the configured one)
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Phases to enable after loading
    #[arg(long, value_enum, default_value_t = PhaseArg::All)]
    pub phase: PhaseArg,

    /// Shut down right after enabling instead of waiting for Ctrl-C
    #[arg(long)]
    pub once: bool,
}

pub async fn run(args: RunArgs, config: &HostConfig) -> Result<()> {
    let mut loader = build_loader(config, args.dir);
    let root = loader.config().plugin_dir.clone();

    let report = loader
        .load_plugins(&root)
        .await
        .with_context(|| format!("Failed to read plugin directory {}", root.display()))?;
    println!(
        "Loaded {} plugin(s), {} failed",
        report.loaded.len(),
        report.failures.len()
    );

    let phases = args.phase.phases();
    for &phase in phases {
        let activation = loader.enable_plugins(phase).await;
        for failure in &activation.failures {
            println!("✗ {}: {}", failure.plugin, render_error(&failure.error));
        }
    }
    print_status(&loader);

    if !args.once {
        println!("Running, press Ctrl-C to stop");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
        println!();
    }

    // Tear down in reverse phase order
    for &phase in phases.iter().rev() {
        let deactivation = loader.disable_plugins(phase).await;
        tracing::debug!(
            phase = %phase,
            disabled = deactivation.changed.len(),
            "Phase disabled"
        );
    }
    println!("All plugins disabled");
    Ok(())
}

fn print_status(loader: &PluginLoader) {
    for info in loader.list_plugins() {
        let status = match info.state {
            PluginState::Enabled => "✓",
            PluginState::Disabled => "○",
            PluginState::Unloaded => "✗",
        };
        println!(
            "{} {} v{}    {}",
            status,
            info.name,
            info.descriptor.version.as_deref().unwrap_or("-"),
            info.descriptor.load_phase()
        );
    }
}
