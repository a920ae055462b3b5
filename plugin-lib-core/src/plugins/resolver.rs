//! Module resolvers - turn a descriptor's entry point into a constructor
//!
//! The loader never assumes how plugin code gets into the process. A
//! [`ModuleResolver`] receives the plugin directory and descriptor and
//! returns a [`ResolvedModule`] that can build the plugin.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use libloading::Library;
use plugin_lib_api::{API_VERSION, Plugin, PluginDescriptor};

use super::error::PluginHostError;

/// Constructor for a concrete plugin type
pub type PluginFactory = Arc<dyn Fn() -> Box<dyn Plugin> + Send + Sync>;

/// A resolved entry point
pub struct ResolvedModule {
    factory: PluginFactory,
    library: Option<Library>,
}

impl ResolvedModule {
    /// Module backed by code already linked into the host
    pub fn from_factory(factory: PluginFactory) -> Self {
        Self {
            factory,
            library: None,
        }
    }

    /// Build a plugin instance
    pub fn create(&self) -> Box<dyn Plugin> {
        (self.factory)()
    }

    /// Split into the constructor and the library that must outlive
    /// every instance it created
    pub(crate) fn into_parts(self) -> (PluginFactory, Option<Library>) {
        (self.factory, self.library)
    }
}

impl fmt::Debug for ResolvedModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedModule")
            .field("library", &self.library.is_some())
            .finish_non_exhaustive()
    }
}

/// Resolves a plugin's `main` entry to a constructor
#[async_trait]
pub trait ModuleResolver: Send + Sync {
    async fn resolve(
        &self,
        dir: &Path,
        descriptor: &PluginDescriptor,
    ) -> Result<ResolvedModule, PluginHostError>;
}

/// Resolver backed by a registration table of statically linked plugins
///
/// Entries are keyed by the descriptor's `main` value.
#[derive(Default, Clone)]
pub struct StaticResolver {
    factories: HashMap<String, PluginFactory>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for an entry point, replacing any previous one
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.factories.insert(entry.into(), Arc::new(factory));
    }

    /// Builder form of [`StaticResolver::register`]
    pub fn with<F>(mut self, entry: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Plugin> + Send + Sync + 'static,
    {
        self.register(entry, factory);
        self
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.factories.contains_key(entry)
    }
}

#[async_trait]
impl ModuleResolver for StaticResolver {
    async fn resolve(
        &self,
        _dir: &Path,
        descriptor: &PluginDescriptor,
    ) -> Result<ResolvedModule, PluginHostError> {
        self.factories
            .get(&descriptor.main)
            .cloned()
            .map(ResolvedModule::from_factory)
            .ok_or_else(|| PluginHostError::EntryPointNotFound {
                plugin: descriptor.name.clone(),
                entry: descriptor.main.clone(),
            })
    }
}

/// Resolver that opens `main` as a shared library built with
/// [`plugin_lib_api::export_plugin!`]
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryResolver;

impl LibraryResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModuleResolver for LibraryResolver {
    async fn resolve(
        &self,
        dir: &Path,
        descriptor: &PluginDescriptor,
    ) -> Result<ResolvedModule, PluginHostError> {
        let lib_path = dir.join(&descriptor.main);
        if !lib_path.is_file() {
            return Err(PluginHostError::EntryPointNotFound {
                plugin: descriptor.name.clone(),
                entry: lib_path.display().to_string(),
            });
        }

        // SAFETY: the library sits in a plugin directory the host was told
        // to load from and is expected to follow the export_plugin! contract.
        let library = unsafe { Library::new(&lib_path)? };

        // SAFETY: symbol signature fixed by export_plugin!
        let api_version_fn: libloading::Symbol<extern "C" fn() -> u32> =
            unsafe { library.get(b"_plugin_lib_api_version")? };

        let plugin_api_version = api_version_fn();
        if plugin_api_version != API_VERSION {
            return Err(PluginHostError::ApiVersionMismatch {
                expected: API_VERSION,
                found: plugin_api_version,
            });
        }

        // SAFETY: symbol signature fixed by export_plugin!. The raw function
        // pointer stays valid while `library` is loaded, and the returned
        // module keeps `library` alive next to every instance it builds.
        let create_fn: extern "C" fn() -> *mut dyn Plugin = unsafe {
            *library.get::<extern "C" fn() -> *mut dyn Plugin>(b"_plugin_lib_create")?
        };

        // SAFETY: `_plugin_lib_create` hands out a pointer from Box::into_raw
        let factory: PluginFactory = Arc::new(move || unsafe { Box::from_raw(create_fn()) });

        Ok(ResolvedModule {
            factory,
            library: Some(library),
        })
    }
}
