//! Plugin host error types

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use plugin_lib_api::PluginError;

/// Lifecycle hook that produced an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Load,
    Enable,
    Disable,
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load => f.write_str("on_load"),
            Self::Enable => f.write_str("on_enable"),
            Self::Disable => f.write_str("on_disable"),
        }
    }
}

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// Descriptor file missing or malformed
    #[error("Invalid plugin description in {path}: {reason}")]
    InvalidDescription { path: PathBuf, reason: String },

    /// Descriptor parsed but carries no usable name
    #[error("Invalid plugin description in {path}: bad name")]
    MissingName { path: PathBuf },

    /// Two plugin directories declare the same name
    #[error("Duplicate plugin '{name}' in {path}")]
    DuplicatePlugin { name: String, path: PathBuf },

    /// Dependency not present anywhere in the candidate pool
    #[error("Missing plugin '{dependency}' required by '{plugin}'")]
    MissingDependency { plugin: String, dependency: String },

    /// Dependency not loaded yet when loading a single plugin
    #[error("Unknown dependency '{dependency}' of '{plugin}'")]
    UnknownDependency { plugin: String, dependency: String },

    /// Dependency was a candidate but could not be loaded
    #[error("Plugin '{plugin}' not loaded because its dependency '{dependency}' failed")]
    DependencyFailed { plugin: String, dependency: String },

    /// Plugin takes part in a dependency cycle
    #[error("Cyclic dependency for '{plugin}': {}", cycle.join(" -> "))]
    CyclicDependency { plugin: String, cycle: Vec<String> },

    /// Entry point could not be resolved to a plugin constructor
    #[error("Entry point '{entry}' of plugin '{plugin}' not found")]
    EntryPointNotFound { plugin: String, entry: String },

    /// API version mismatch between host and plugin
    #[error("API version mismatch: host expects {expected}, plugin has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// Failed to load dynamic library
    #[error("Failed to load plugin library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// A lifecycle hook returned an error
    #[error("Plugin '{plugin}' failed in {hook}: {source}")]
    Hook {
        plugin: String,
        hook: Hook,
        #[source]
        source: PluginError,
    },

    /// Plugin not found
    #[error("Plugin '{name}' not found")]
    NotFound { name: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginHostError {
    pub(crate) fn hook(plugin: &str, hook: Hook, source: PluginError) -> Self {
        Self::Hook {
            plugin: plugin.to_string(),
            hook,
            source,
        }
    }
}
