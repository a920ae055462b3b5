//! Plugin registry - the loader's name-keyed store of plugin instances

use std::collections::HashMap;

use libloading::Library;
use plugin_lib_api::PluginInstance;

/// A registered plugin with the library its code came from
pub(crate) struct LoadedPlugin {
    /// Declared before `_library` so the instance is dropped first
    pub(crate) instance: PluginInstance,
    /// Keep the library loaded
    _library: Option<Library>,
}

impl LoadedPlugin {
    pub(crate) fn new(instance: PluginInstance, library: Option<Library>) -> Self {
        Self {
            instance,
            _library: library,
        }
    }
}

/// Registry of loaded plugins
///
/// Iteration follows insertion order. Re-inserting a known name replaces
/// the instance but keeps its position.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, LoadedPlugin>,
    order: Vec<String>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a plugin, returning the previous entry of the same name
    pub(crate) fn insert(&mut self, plugin: LoadedPlugin) -> Option<LoadedPlugin> {
        let name = plugin.instance.name().to_string();
        if !self.plugins.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.plugins.insert(name, plugin)
    }

    /// Remove a plugin by name
    ///
    /// The entry is returned whole so its library outlives the instance.
    pub(crate) fn remove(&mut self, name: &str) -> Option<LoadedPlugin> {
        let removed = self.plugins.remove(name)?;
        self.order.retain(|n| n != name);
        Some(removed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&PluginInstance> {
        self.plugins.get(name).map(|p| &p.instance)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut PluginInstance> {
        self.plugins.get_mut(name).map(|p| &mut p.instance)
    }

    /// Registered names in insertion order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Registered plugins in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PluginInstance> {
        self.order
            .iter()
            .filter_map(|name| self.plugins.get(name))
            .map(|p| &p.instance)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
