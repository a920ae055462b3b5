use super::types::{
    ApplicationConfig, HostConfig, PluginsConfig, RawApplicationConfig, RawHostConfig,
    RawPluginsConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<HostConfig> {
        let mut raw = RawHostConfig::default();

        // Layer 1: User config
        if let Some(user_config) = Self::read_raw(&Self::user_config_path())? {
            raw = Self::merge_raw(raw, user_config);
        }

        // Layer 2: Project config
        if let Some(project_config) = Self::read_raw(&Self::project_config_path())? {
            raw = Self::merge_raw(raw, project_config);
        }

        Ok(Self::finalize(raw))
    }

    /// Load a single config file, applying defaults. A missing file yields
    /// the defaults.
    pub fn load_from_path(path: &Path) -> Result<HostConfig> {
        let raw = Self::read_raw(path)?.unwrap_or_default();
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<Option<RawHostConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        tracing::debug!(path = %path.display(), "Loaded config layer");
        Ok(Some(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/plugin-lib/config.toml`)
    pub fn user_config_path() -> PathBuf {
        plugin_lib_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with PLUGIN_LIB_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        plugin_lib_paths::project_config_dir(&cwd).join("config.toml")
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawHostConfig, overlay: RawHostConfig) -> RawHostConfig {
        RawHostConfig {
            plugins: RawPluginsConfig {
                dir: overlay.plugins.dir.or(base.plugins.dir),
                descriptor_file: overlay
                    .plugins
                    .descriptor_file
                    .or(base.plugins.descriptor_file),
            },
            application: RawApplicationConfig {
                name: overlay.application.name.or(base.application.name),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawHostConfig) -> HostConfig {
        let plugins = PluginsConfig::default();
        let application = ApplicationConfig::default();
        HostConfig {
            plugins: PluginsConfig {
                dir: raw.plugins.dir.unwrap_or(plugins.dir),
                descriptor_file: raw
                    .plugins
                    .descriptor_file
                    .unwrap_or(plugins.descriptor_file),
            },
            application: ApplicationConfig {
                name: raw.application.name.unwrap_or(application.name),
            },
        }
    }
}
