//! XDG Base Directory paths for plugin-lib.
//!
//! CLI tools should use XDG paths for cross-platform consistency,
//! not platform-native paths.

use std::path::{Path, PathBuf};

/// Directory name used under the XDG config root
pub const APP_DIR: &str = "plugin-lib";

/// Project-local directory holding a project config file
pub const PROJECT_DIR: &str = ".plugin-lib";

/// Environment variable overriding the project config directory
pub const PROJECT_CONFIG_ENV: &str = "PLUGIN_LIB_PROJECT_CONFIG_DIR";

/// Get the plugin-lib config directory.
///
/// Returns `$XDG_CONFIG_HOME/plugin-lib` if set, otherwise
/// `~/.config/plugin-lib`.
///
/// # Examples
///
/// ```
/// use plugin_lib_paths::config_dir;
///
/// let config = config_dir();
/// let plugin_dir = config.join("plugins");
/// ```
pub fn config_dir() -> PathBuf {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg_config) if !xdg_config.is_empty() => PathBuf::from(xdg_config).join(APP_DIR),
        _ => match dirs::home_dir() {
            Some(home) => home.join(".config").join(APP_DIR),
            None => PathBuf::from(".config").join(APP_DIR),
        },
    }
}

/// Default plugin root: `<config_dir>/plugins`
pub fn plugins_dir() -> PathBuf {
    config_dir().join("plugins")
}

/// User-level config file: `<config_dir>/config.toml`
pub fn user_config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Project config directory for a working directory.
///
/// `$PLUGIN_LIB_PROJECT_CONFIG_DIR` wins when set, otherwise
/// `<cwd>/.plugin-lib`.
pub fn project_config_dir(cwd: &Path) -> PathBuf {
    match std::env::var(PROJECT_CONFIG_ENV) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => cwd.join(PROJECT_DIR),
    }
}
