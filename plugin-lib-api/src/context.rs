//! PluginContext - the lifecycle state shared by every plugin
//!
//! Concrete plugins only implement the hooks of [`crate::Plugin`]. The
//! bookkeeping every plugin needs (identity, origin directory, enabled
//! flag, configuration, host application) lives here and is handed to each
//! hook by the loader.

use crate::application::{Application, Logger};
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name of the optional per-plugin configuration file
pub const CONFIG_FILE: &str = "config.toml";

/// Plugin's view of its own lifecycle state and of the host application
pub struct PluginContext {
    application: Arc<dyn Application>,
    description: PluginDescriptor,
    plugin_dir: PathBuf,
    config: PluginConfig,
    enabled: bool,
}

/// Plugin configuration - key-value store backed by TOML
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    values: HashMap<String, toml::Value>,
    dirty: bool,
}

impl PluginContext {
    /// Create a new context with an empty configuration
    pub fn new(
        application: Arc<dyn Application>,
        description: PluginDescriptor,
        plugin_dir: PathBuf,
    ) -> Self {
        Self::with_config(application, description, plugin_dir, PluginConfig::new())
    }

    /// Create a context with a pre-loaded config
    pub fn with_config(
        application: Arc<dyn Application>,
        description: PluginDescriptor,
        plugin_dir: PathBuf,
        config: PluginConfig,
    ) -> Self {
        Self {
            application,
            description,
            plugin_dir,
            config,
            enabled: false,
        }
    }

    // ─── Identity ────────────────────────────────────────────────────

    /// The plugin's name, as declared in its descriptor
    pub fn plugin_name(&self) -> &str {
        &self.description.name
    }

    /// The descriptor the plugin was loaded from
    pub fn description(&self) -> &PluginDescriptor {
        &self.description
    }

    /// The directory the plugin was loaded from
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// The hosting application
    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    /// The host application's logger
    pub fn logger(&self) -> &dyn Logger {
        self.application.logger()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled_flag(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Read a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let threshold: Option<u32> = ctx.config_get("threshold");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config.get(key)
    }

    /// Write a configuration value
    ///
    /// Changes stay in memory until [`PluginContext::save_config`] is called.
    pub fn config_set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        self.config.set(key, value)
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Path of the plugin's `config.toml`
    pub fn config_path(&self) -> PathBuf {
        self.plugin_dir.join(CONFIG_FILE)
    }

    /// Re-read `config.toml`, discarding unsaved changes
    pub fn reload_config(&mut self) -> Result<(), PluginError> {
        self.config = PluginConfig::load(&self.config_path())?;
        Ok(())
    }

    /// Persist the configuration to `config.toml`
    pub fn save_config(&mut self) -> Result<(), PluginError> {
        let path = self.config_path();
        self.config.save(&path)
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        self.logger()
            .info(&format!("[{}] {}", self.plugin_name(), message));
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        self.logger()
            .warn(&format!("[{}] {}", self.plugin_name(), message));
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        self.logger()
            .error(&format!("[{}] {}", self.plugin_name(), message));
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        self.logger()
            .debug(&format!("[{}] {}", self.plugin_name(), message));
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("application", &self.application.name())
            .field("description", &self.description)
            .field("plugin_dir", &self.plugin_dir)
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl PluginConfig {
    /// Create a new empty config
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
            dirty: false,
        }
    }

    /// Load configuration from a TOML file
    ///
    /// A missing file yields an empty configuration.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        let values: HashMap<String, toml::Value> =
            toml::from_str(&content).map_err(|e| PluginError::Config(e.to_string()))?;
        Ok(Self {
            values,
            dirty: false,
        })
    }

    /// Save configuration to a TOML file
    pub fn save(&mut self, path: &Path) -> Result<(), PluginError> {
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| PluginError::Serialization(e.to_string()))?;

        if let Some(parent) = path.parent().filter(|p| !p.exists()) {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, content)?;
        self.dirty = false;
        Ok(())
    }

    /// Get a configuration value
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.values.get(key).and_then(|v| v.clone().try_into().ok())
    }

    /// Set a configuration value
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), PluginError> {
        let toml_value =
            toml::Value::try_from(value).map_err(|e| PluginError::Serialization(e.to_string()))?;
        self.values.insert(key.to_string(), toml_value);
        self.dirty = true;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Check if the config has been modified since loading/saving
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::new()
    }
}
