use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use plugin_lib_api::DESCRIPTOR_FILE;
use plugin_lib_core::PluginHostConfig;

/// Application name used when none is configured
pub const DEFAULT_APP_NAME: &str = "plugin-lib";

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawHostConfig {
    #[serde(default)]
    pub plugins: RawPluginsConfig,

    #[serde(default)]
    pub application: RawApplicationConfig,
}

/// `[plugins]` as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawPluginsConfig {
    /// Plugin root directory
    pub dir: Option<PathBuf>,

    /// Descriptor file name inside each plugin directory
    pub descriptor_file: Option<String>,
}

/// `[application]` as stored in TOML
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawApplicationConfig {
    /// Name the host reports to plugins and logs under
    pub name: Option<String>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HostConfig {
    #[serde(default)]
    pub plugins: PluginsConfig,

    #[serde(default)]
    pub application: ApplicationConfig,
}

impl HostConfig {
    /// Loader configuration, optionally pointed at another plugin root
    pub fn host_config(&self, dir_override: Option<PathBuf>) -> PluginHostConfig {
        PluginHostConfig {
            plugin_dir: dir_override.unwrap_or_else(|| self.plugins.dir.clone()),
            descriptor_file: self.plugins.descriptor_file.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PluginsConfig {
    pub dir: PathBuf,
    pub descriptor_file: String,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            dir: plugin_lib_paths::plugins_dir(),
            descriptor_file: DESCRIPTOR_FILE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationConfig {
    pub name: String,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_APP_NAME.to_string(),
        }
    }
}
