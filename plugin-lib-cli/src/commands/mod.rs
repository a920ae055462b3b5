//! Subcommands of the `plugin-lib` binary

pub mod config;
pub mod list;
pub mod plan;
pub mod run;

use std::path::PathBuf;
use std::sync::Arc;

use plugin_lib_api::BasicApplication;
use plugin_lib_core::{LibraryResolver, PluginLoader};

use crate::config::HostConfig;

/// Build a loader for the configured (or overridden) plugin root
pub(crate) fn build_loader(config: &HostConfig, dir: Option<PathBuf>) -> PluginLoader {
    let application = Arc::new(BasicApplication::new(
        config.application.name.clone(),
        env!("CARGO_PKG_VERSION"),
    ));
    PluginLoader::new(
        application,
        Arc::new(LibraryResolver::new()),
        config.host_config(dir),
    )
}
