//! plugin-lib-core: Plugin host runtime
//!
//! This crate loads plugins built against `plugin-lib-api`:
//!
//! - **Discovery** - every subdirectory of a plugin root holding a
//!   `package.json` descriptor is a candidate
//! - **Dependency ordering** - [`DependencyGraph`] orders candidates so a
//!   plugin loads after everything it depends on, and rejects missing or
//!   cyclic dependencies without looping
//! - **Lifecycle** - [`PluginLoader`] runs `on_load`, then enables and
//!   disables plugins by [`LoadPhase`](plugin_lib_api::LoadPhase)
//! - **Entry points** - [`ModuleResolver`] implementations map a
//!   descriptor's `main` to plugin code, either statically registered
//!   ([`StaticResolver`]) or from a shared library ([`LibraryResolver`])
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use plugin_lib_api::{BasicApplication, LoadPhase};
//! use plugin_lib_core::{LibraryResolver, PluginHostConfig, PluginLoader};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let app = Arc::new(BasicApplication::new("my-app", "1.0.0"));
//!     let mut loader = PluginLoader::new(
//!         app,
//!         Arc::new(LibraryResolver::new()),
//!         PluginHostConfig::default(),
//!     );
//!
//!     let report = loader.load_all().await?;
//!     println!("loaded: {:?}", report.loaded);
//!
//!     loader.enable_plugins(LoadPhase::Startup).await;
//!     loader.enable_plugins(LoadPhase::PostStart).await;
//!     Ok(())
//! }
//! ```

pub mod plugins;

pub use plugins::{
    ActivationReport, DependencyGraph, LibraryResolver, LoadReport, ModuleResolver,
    PluginFailure, PluginHostConfig, PluginHostError, PluginInfo, PluginLoader, PluginRegistry,
    Resolution, StaticResolver,
};
