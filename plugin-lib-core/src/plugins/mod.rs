//! Plugin hosting: discovery, dependency ordering, loading and activation
//!
//! - [`PluginLoader`]: loads plugin directories in dependency order and
//!   switches them on and off per [`LoadPhase`](plugin_lib_api::LoadPhase)
//! - [`DependencyGraph`]: plans the load order and reports what can't load
//! - [`ModuleResolver`]: turns a descriptor's `main` entry into a plugin
//! - [`PluginRegistry`]: name-keyed store of loaded plugins
//! - [`PluginHostError`]: error types for plugin operations
//!
//! # Plugin Structure
//!
//! Each plugin directory should contain:
//! - `package.json` - the descriptor (`name`, `main`, `plugin-lib$load`,
//!   `plugin-lib$depends`)
//! - the entry point named by `main`, e.g. a shared library for
//!   [`LibraryResolver`]
//! - `config.toml` (optional) - plugin configuration
//!
//! # Example
//!
//! ```ignore
//! use plugin_lib_core::plugins::{LibraryResolver, PluginHostConfig, PluginLoader};
//!
//! let mut loader = PluginLoader::new(app, Arc::new(LibraryResolver::new()), PluginHostConfig::default());
//!
//! let report = loader.load_all().await?;
//! loader.enable_plugins(LoadPhase::Startup).await;
//! loader.enable_plugins(LoadPhase::PostStart).await;
//! ```

mod descriptor;
mod error;
mod graph;
mod loader;
mod registry;
mod resolver;

pub use descriptor::read_descriptor;
pub use error::{Hook, PluginHostError};
pub use graph::{DependencyGraph, RejectReason, Rejection, Resolution};
pub use loader::{
    ActivationReport, Candidate, Discovery, LoadReport, PluginFailure, PluginHostConfig,
    PluginInfo, PluginLoader,
};
pub use registry::PluginRegistry;
pub use resolver::{LibraryResolver, ModuleResolver, PluginFactory, ResolvedModule, StaticResolver};
