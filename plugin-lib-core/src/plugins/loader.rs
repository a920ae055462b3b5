//! PluginLoader - discovers, orders, loads and activates plugins

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use plugin_lib_api::{
    Application, CONFIG_FILE, DESCRIPTOR_FILE, LoadPhase, Logger, PluginConfig, PluginContext,
    PluginDescriptor, PluginInstance, PluginState,
};

use super::descriptor::read_descriptor;
use super::error::{Hook, PluginHostError};
use super::graph::{DependencyGraph, Resolution};
use super::registry::{LoadedPlugin, PluginRegistry};
use super::resolver::ModuleResolver;

/// Configuration for PluginLoader
#[derive(Debug, Clone)]
pub struct PluginHostConfig {
    /// Directory scanned by [`PluginLoader::load_all`] (~/.config/plugin-lib/plugins)
    pub plugin_dir: PathBuf,
    /// Descriptor file name inside each plugin directory
    pub descriptor_file: String,
}

impl Default for PluginHostConfig {
    fn default() -> Self {
        Self {
            plugin_dir: plugin_lib_paths::config_dir().join("plugins"),
            descriptor_file: DESCRIPTOR_FILE.to_string(),
        }
    }
}

/// Information about a registered plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    pub name: String,
    pub descriptor: PluginDescriptor,
    pub state: PluginState,
    pub path: PathBuf,
}

/// A plugin that could not be loaded or switched
#[derive(Debug)]
pub struct PluginFailure {
    /// Plugin name, or the directory name when no name could be read
    pub plugin: String,
    pub error: PluginHostError,
}

/// Outcome of a [`PluginLoader::load_plugins`] batch
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Plugins loaded by this batch, in load order
    pub loaded: Vec<String>,
    pub failures: Vec<PluginFailure>,
}

impl LoadReport {
    pub fn failure(&self, plugin: &str) -> Option<&PluginHostError> {
        self.failures
            .iter()
            .find(|f| f.plugin == plugin)
            .map(|f| &f.error)
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of a phase-wide enable or disable
#[derive(Debug)]
pub struct ActivationReport {
    pub phase: LoadPhase,
    /// Plugins whose state actually changed
    pub changed: Vec<String>,
    pub failures: Vec<PluginFailure>,
}

impl ActivationReport {
    fn new(phase: LoadPhase) -> Self {
        Self {
            phase,
            changed: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A plugin directory with its parsed descriptor
#[derive(Debug, Clone)]
pub struct Candidate {
    pub dir: PathBuf,
    pub descriptor: PluginDescriptor,
}

/// Plugin directories found under a root, before anything is loaded
#[derive(Debug, Default)]
pub struct Discovery {
    pub candidates: Vec<Candidate>,
    /// Directories skipped for unreadable, nameless or duplicate descriptors
    pub failures: Vec<PluginFailure>,
}

impl Discovery {
    /// Dependency graph over the candidates
    pub fn graph(&self) -> DependencyGraph {
        let mut graph = DependencyGraph::new();
        for candidate in &self.candidates {
            graph.add(
                candidate.descriptor.name.as_str(),
                candidate.descriptor.depends.iter().map(String::as_str),
            );
        }
        graph
    }

    /// Plan a load order. `satisfied` reports dependencies available
    /// outside this set of candidates.
    pub fn plan<F>(&self, satisfied: F) -> Resolution
    where
        F: Fn(&str) -> bool,
    {
        self.graph().plan(satisfied)
    }
}

/// Loads plugins in dependency order and drives their lifecycle
pub struct PluginLoader {
    application: Arc<dyn Application>,
    resolver: Arc<dyn ModuleResolver>,
    registry: PluginRegistry,
    config: PluginHostConfig,
}

impl PluginLoader {
    pub fn new(
        application: Arc<dyn Application>,
        resolver: Arc<dyn ModuleResolver>,
        config: PluginHostConfig,
    ) -> Self {
        Self {
            application,
            resolver,
            registry: PluginRegistry::new(),
            config,
        }
    }

    pub fn application(&self) -> &Arc<dyn Application> {
        &self.application
    }

    pub fn config(&self) -> &PluginHostConfig {
        &self.config
    }

    fn logger(&self) -> &dyn Logger {
        self.application.logger()
    }

    pub fn get_plugin(&self, name: &str) -> Option<&PluginInstance> {
        self.registry.get(name)
    }

    /// Registered plugins in load order
    pub fn plugins(&self) -> impl Iterator<Item = &PluginInstance> {
        self.registry.iter()
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn plugin_count(&self) -> usize {
        self.registry.len()
    }

    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.registry
            .iter()
            .map(|p| PluginInfo {
                name: p.name().to_string(),
                descriptor: p.description().clone(),
                state: p.state(),
                path: p.file().to_path_buf(),
            })
            .collect()
    }

    /// Read the descriptor of the plugin in `dir`
    pub async fn plugin_description(&self, dir: &Path) -> Result<PluginDescriptor, PluginHostError> {
        read_descriptor(dir, &self.config.descriptor_file, self.logger()).await
    }

    /// Read every plugin directory under `root` without loading anything
    ///
    /// Entries are visited in file name order. Per-directory problems end
    /// up in [`Discovery::failures`]; only failing to list `root` is an error.
    pub async fn discover(&self, root: &Path) -> Result<Discovery, PluginHostError> {
        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_dir = tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_dir());
            if is_dir {
                dirs.push(path);
            }
        }
        dirs.sort();

        let mut discovery = Discovery::default();
        let mut seen: HashSet<String> = HashSet::new();
        for dir in dirs {
            let dir_name = dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();

            let descriptor = match self.plugin_description(&dir).await {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    discovery.failures.push(PluginFailure {
                        plugin: dir_name,
                        error,
                    });
                    continue;
                }
            };

            if !descriptor.has_name() {
                discovery.failures.push(PluginFailure {
                    plugin: dir_name,
                    error: PluginHostError::MissingName { path: dir },
                });
                continue;
            }

            if !seen.insert(descriptor.name.clone()) {
                discovery.failures.push(PluginFailure {
                    plugin: descriptor.name.clone(),
                    error: PluginHostError::DuplicatePlugin {
                        name: descriptor.name,
                        path: dir,
                    },
                });
                continue;
            }

            discovery.candidates.push(Candidate { dir, descriptor });
        }

        Ok(discovery)
    }

    /// Load every plugin under the configured plugin directory
    ///
    /// A missing directory loads nothing.
    pub async fn load_all(&mut self) -> Result<LoadReport, PluginHostError> {
        let root = self.config.plugin_dir.clone();
        if !root.exists() {
            tracing::debug!(dir = %root.display(), "Plugin directory does not exist");
            return Ok(LoadReport::default());
        }
        self.load_plugins(&root).await
    }

    /// Load every plugin under `root` in dependency order
    ///
    /// Failures are logged, recorded in the report and only affect the
    /// failing plugin and whatever depends on it.
    pub async fn load_plugins(&mut self, root: &Path) -> Result<LoadReport, PluginHostError> {
        let discovery = self.discover(root).await?;
        let graph = discovery.graph();
        let mut report = LoadReport::default();

        for failure in discovery.failures {
            self.logger().error_source(&failure.error);
            report.failures.push(failure);
        }

        let resolution = graph.plan(|name| self.registry.contains(name));

        let mut failed: HashSet<String> = HashSet::new();
        for rejection in resolution.rejected {
            let failure = PluginFailure {
                plugin: rejection.plugin.clone(),
                error: rejection.into_error(),
            };
            self.logger().error_source(&failure.error);
            failed.insert(failure.plugin.clone());
            report.failures.push(failure);
        }

        let dirs: HashMap<&str, &Path> = discovery
            .candidates
            .iter()
            .map(|c| (c.descriptor.name.as_str(), c.dir.as_path()))
            .collect();

        for name in resolution.order {
            let Some(dir) = dirs.get(name.as_str()).copied() else {
                continue;
            };

            if let Some(dependency) = graph
                .dependencies(&name)
                .iter()
                .find(|dep| failed.contains(dep.as_str()))
            {
                let error = PluginHostError::DependencyFailed {
                    plugin: name.clone(),
                    dependency: dependency.clone(),
                };
                self.logger().error_source(&error);
                failed.insert(name.clone());
                report.failures.push(PluginFailure {
                    plugin: name,
                    error,
                });
                continue;
            }

            self.logger()
                .trace(&format!("All dependencies loaded for plugin {name}"));

            match self.load_plugin(dir).await {
                Ok(()) => report.loaded.push(name),
                Err(error) => {
                    self.logger().error(&format!("Could not load {name}"));
                    self.logger().error_source(&error);
                    failed.insert(name.clone());
                    report.failures.push(PluginFailure {
                        plugin: name,
                        error,
                    });
                }
            }
        }

        tracing::debug!(
            loaded = report.loaded.len(),
            failed = report.failures.len(),
            "Plugin batch finished"
        );

        Ok(report)
    }

    /// Load the single plugin in `dir`
    ///
    /// Every dependency must already be registered. The plugin is
    /// registered and then `on_load` runs; if it fails the plugin is
    /// dropped from the registry again.
    ///
    /// Reloading a registered name disables the old instance first. If the
    /// replacement fails to load, the old instance is put back (disabled).
    pub async fn load_plugin(&mut self, dir: &Path) -> Result<(), PluginHostError> {
        let descriptor = self.plugin_description(dir).await?;
        if !descriptor.has_name() {
            return Err(PluginHostError::MissingName {
                path: dir.to_path_buf(),
            });
        }

        if let Some(dependency) = descriptor
            .depends
            .iter()
            .find(|dep| !self.registry.contains(dep.as_str()))
        {
            return Err(PluginHostError::UnknownDependency {
                plugin: descriptor.name.clone(),
                dependency: dependency.clone(),
            });
        }

        let name = descriptor.name.clone();
        self.logger().info(&format!("Load plugin {name}"));

        let module = self.resolver.resolve(dir, &descriptor).await?;
        let (factory, library) = module.into_parts();

        let config_path = dir.join(CONFIG_FILE);
        let config = PluginConfig::load(&config_path).unwrap_or_else(|e| {
            tracing::warn!(plugin = %name, error = %e, "Ignoring unreadable plugin config");
            PluginConfig::default()
        });

        let context =
            PluginContext::with_config(self.application.clone(), descriptor, dir.to_path_buf(), config);
        let instance = PluginInstance::new(factory(), context);

        if self.registry.contains(&name) {
            self.logger().warn(&format!("Replacing plugin {name}"));
            self.switch(&name, false).await?;
        }
        let previous = self.registry.insert(LoadedPlugin::new(instance, library));

        let result = match self.registry.get_mut(&name) {
            Some(plugin) => plugin.load().await,
            None => return Err(PluginHostError::NotFound { name }),
        };

        if let Err(source) = result {
            match previous {
                Some(previous) => {
                    self.logger().warn(&format!("Keeping previous instance of {name}"));
                    self.registry.insert(previous);
                }
                None => {
                    self.registry.remove(&name);
                }
            }
            return Err(PluginHostError::hook(&name, Hook::Load, source));
        }

        self.logger().info(&format!("{name} loaded"));
        Ok(())
    }

    /// Enable every registered plugin of `phase`
    pub async fn enable_plugins(&mut self, phase: LoadPhase) -> ActivationReport {
        self.switch_phase(phase, true).await
    }

    /// Disable every registered plugin of `phase`
    pub async fn disable_plugins(&mut self, phase: LoadPhase) -> ActivationReport {
        self.switch_phase(phase, false).await
    }

    async fn switch_phase(&mut self, phase: LoadPhase, enabled: bool) -> ActivationReport {
        let mut report = ActivationReport::new(phase);
        let names: Vec<String> = self.registry.names().to_vec();

        for name in names {
            let in_phase = self
                .registry
                .get(&name)
                .is_some_and(|p| p.description().load_phase() == phase);
            if !in_phase {
                continue;
            }

            match self.switch(&name, enabled).await {
                Ok(true) => report.changed.push(name),
                Ok(false) => {}
                Err(error) => {
                    let action = if enabled { "enabling" } else { "disabling" };
                    self.logger().error(&format!(
                        "Error occurred while {action} {name} in phase {phase}"
                    ));
                    self.logger().error_source(&error);
                    report.failures.push(PluginFailure {
                        plugin: name,
                        error,
                    });
                }
            }
        }

        report
    }

    /// Enable one plugin by name
    pub async fn enable_plugin(&mut self, name: &str) -> Result<(), PluginHostError> {
        self.switch(name, true).await.map(|_| ())
    }

    /// Disable one plugin by name. It stays registered.
    pub async fn disable_plugin(&mut self, name: &str) -> Result<(), PluginHostError> {
        self.switch(name, false).await.map(|_| ())
    }

    /// Returns whether the plugin's state changed
    async fn switch(&mut self, name: &str, enabled: bool) -> Result<bool, PluginHostError> {
        let logger = self.application.logger();
        let plugin = self
            .registry
            .get_mut(name)
            .ok_or_else(|| PluginHostError::NotFound {
                name: name.to_string(),
            })?;

        if plugin.is_enabled() == enabled {
            return Ok(false);
        }

        let hook = if enabled {
            logger.info(&format!("Enabling {name}"));
            Hook::Enable
        } else {
            logger.info(&format!("Disabling {name}"));
            Hook::Disable
        };

        plugin
            .set_enabled(enabled)
            .await
            .map_err(|source| PluginHostError::hook(name, hook, source))?;
        Ok(true)
    }

    /// Disable a plugin if needed and drop it from the registry
    ///
    /// If `on_disable` fails the plugin stays registered.
    pub async fn unload_plugin(&mut self, name: &str) -> Result<(), PluginHostError> {
        self.switch(name, false).await?;
        if self.registry.remove(name).is_none() {
            return Err(PluginHostError::NotFound {
                name: name.to_string(),
            });
        }
        self.logger().info(&format!("{name} unloaded"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::StaticResolver;
    use plugin_lib_api::BasicApplication;
    use tempfile::TempDir;

    fn loader(plugin_dir: &Path) -> PluginLoader {
        PluginLoader::new(
            Arc::new(BasicApplication::new("host", "1.0.0")),
            Arc::new(StaticResolver::new()),
            PluginHostConfig {
                plugin_dir: plugin_dir.to_path_buf(),
                descriptor_file: DESCRIPTOR_FILE.to_string(),
            },
        )
    }

    #[test]
    fn test_plugin_host_config_default() {
        let config = PluginHostConfig::default();
        assert!(config.plugin_dir.ends_with("plugin-lib/plugins"));
        assert_eq!(config.descriptor_file, "package.json");
    }

    #[test]
    fn test_loader_new_is_empty() {
        let dir = TempDir::new().unwrap();
        let loader = loader(dir.path());
        assert_eq!(loader.plugin_count(), 0);
        assert!(loader.list_plugins().is_empty());
        assert_eq!(loader.application().name(), "host");
    }

    #[tokio::test]
    async fn test_load_all_missing_dir_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(&dir.path().join("absent"));
        let report = loader.load_all().await.unwrap();
        assert!(report.loaded.is_empty());
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_load_plugins_unreadable_root_is_error() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(dir.path());
        let result = loader.load_plugins(&dir.path().join("absent")).await;
        assert!(matches!(result, Err(PluginHostError::Io(_))));
    }

    #[tokio::test]
    async fn test_discover_skips_plain_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("README.md"), "not a plugin").unwrap();
        let loader = loader(dir.path());

        let discovery = loader.discover(dir.path()).await.unwrap();
        assert!(discovery.candidates.is_empty());
        assert!(discovery.failures.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_discover_follows_symlinked_directories() {
        let dir = TempDir::new().unwrap();
        let elsewhere = TempDir::new().unwrap();
        std::fs::write(
            elsewhere.path().join("package.json"),
            r#"{"name": "linked", "main": "linked.so"}"#,
        )
        .unwrap();
        std::os::unix::fs::symlink(elsewhere.path(), dir.path().join("linked")).unwrap();
        std::os::unix::fs::symlink(dir.path().join("gone"), dir.path().join("dangling")).unwrap();
        let loader = loader(dir.path());

        let discovery = loader.discover(dir.path()).await.unwrap();
        let names: Vec<&str> = discovery
            .candidates
            .iter()
            .map(|c| c.descriptor.name.as_str())
            .collect();
        assert_eq!(names, vec!["linked"]);
        assert!(discovery.failures.is_empty());
    }

    #[tokio::test]
    async fn test_enable_unknown_plugin_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(dir.path());
        let result = loader.enable_plugin("ghost").await;
        assert!(matches!(result, Err(PluginHostError::NotFound { ref name }) if name == "ghost"));
        assert!(matches!(
            loader.unload_plugin("ghost").await,
            Err(PluginHostError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_phase_switch_on_empty_registry() {
        let dir = TempDir::new().unwrap();
        let mut loader = loader(dir.path());
        let report = loader.enable_plugins(LoadPhase::Startup).await;
        assert_eq!(report.phase, LoadPhase::Startup);
        assert!(report.changed.is_empty());
        assert!(report.is_clean());
    }
}
