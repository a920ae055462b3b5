//! `plugin-lib list` - show plugin descriptors without loading anything

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use plugin_lib_api::render_error;
use plugin_lib_core::plugins::Discovery;

use super::build_loader;
use crate::config::HostConfig;

#[derive(Args)]
pub struct ListArgs {
    /// Plugin root directory (defaults to the configured one)
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

pub async fn run(args: ListArgs, config: &HostConfig) -> Result<()> {
    let loader = build_loader(config, args.dir);
    let root = loader.config().plugin_dir.clone();

    if !root.exists() {
        println!("No plugins installed");
        println!();
        println!("Plugin directory: {}", root.display());
        println!();
        println!("To install a plugin:");
        println!("  1. Create a plugin directory: mkdir -p {}/my-plugin", root.display());
        println!("  2. Copy the plugin library into it");
        println!("  3. Add a package.json with at least \"name\" and \"main\"");
        return Ok(());
    }

    let discovery = loader
        .discover(&root)
        .await
        .with_context(|| format!("Failed to read plugin directory {}", root.display()))?;
    print!("{}", format_discovery(&discovery));
    Ok(())
}

/// One line per candidate, then one per skipped directory
pub fn format_discovery(discovery: &Discovery) -> String {
    let mut out = String::new();
    if discovery.candidates.is_empty() && discovery.failures.is_empty() {
        out.push_str("No plugins found\n");
        return out;
    }

    for candidate in &discovery.candidates {
        let d = &candidate.descriptor;
        let version = d.version.as_deref().unwrap_or("-");
        let depends = if d.depends.is_empty() {
            "-".to_string()
        } else {
            d.depends.join(", ")
        };
        out.push_str(&format!(
            "○ {:<20} v{:<10} {:<10} depends: {}\n",
            d.name,
            version,
            d.load_phase(),
            depends
        ));
    }

    for failure in &discovery.failures {
        out.push_str(&format!(
            "✗ {:<20} {}\n",
            failure.plugin,
            render_error(&failure.error)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugin_lib_api::{LoadPhase, PluginDescriptor};
    use plugin_lib_core::PluginHostError;
    use plugin_lib_core::plugins::{Candidate, PluginFailure};

    #[test]
    fn test_list_args_parsing() {
        use clap::Parser;

        #[derive(Parser)]
        struct TestCli {
            #[command(flatten)]
            args: ListArgs,
        }

        let cli = TestCli::parse_from(["test"]);
        assert!(cli.args.dir.is_none());

        let cli = TestCli::parse_from(["test", "--dir", "/srv/plugins"]);
        assert_eq!(cli.args.dir, Some(PathBuf::from("/srv/plugins")));
    }

    #[test]
    fn test_format_empty_discovery() {
        assert_eq!(format_discovery(&Discovery::default()), "No plugins found\n");
    }

    #[test]
    fn test_format_discovery_lines() {
        let mut descriptor = PluginDescriptor::new("search", "libsearch.so")
            .with_depends(["index"])
            .with_load_phase(LoadPhase::PostStart);
        descriptor.version = Some("0.3.0".to_string());

        let discovery = Discovery {
            candidates: vec![Candidate {
                dir: PathBuf::from("/plugins/search"),
                descriptor,
            }],
            failures: vec![PluginFailure {
                plugin: "broken".to_string(),
                error: PluginHostError::MissingName {
                    path: PathBuf::from("/plugins/broken"),
                },
            }],
        };

        let out = format_discovery(&discovery);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("○ search"));
        assert!(lines[0].contains("v0.3.0"));
        assert!(lines[0].contains("POSTSTART"));
        assert!(lines[0].contains("depends: index"));
        assert!(lines[1].starts_with("✗ broken"));
        assert!(lines[1].contains("bad name"));
    }
}
