//! plugin-lib-api - Plugin API for the plugin-lib host runtime
//!
//! This crate provides the traits and types needed to write plugins. A
//! plugin is a directory holding a `package.json` descriptor and an entry
//! point; the host loads plugins in dependency order and drives them
//! through their lifecycle hooks.
//!
//! # Example
//!
//! ```ignore
//! use plugin_lib_api::{async_trait, export_plugin, Plugin, PluginContext, PluginError};
//!
//! #[derive(Default)]
//! pub struct MyPlugin;
//!
//! #[async_trait]
//! impl Plugin for MyPlugin {
//!     async fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         ctx.log_info("Plugin loaded!");
//!         Ok(())
//!     }
//!
//!     async fn on_enable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//!
//!     async fn on_disable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(MyPlugin);
//! ```

pub mod application;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod instance;

pub use application::{Application, BasicApplication, Logger, TracingLogger, render_error};
pub use async_trait::async_trait;
pub use context::{CONFIG_FILE, PluginConfig, PluginContext};
pub use descriptor::{Author, DESCRIPTOR_FILE, LoadPhase, PluginDescriptor};
pub use error::PluginError;
pub use instance::{PluginInstance, PluginState};

/// Current plugin API version. Plugins must match this exactly.
/// This will be checked when loading plugins to ensure compatibility.
pub const API_VERSION: u32 = 1;

/// The core plugin trait - implement this to create a plugin.
///
/// Each hook receives the plugin's [`PluginContext`], which carries the
/// descriptor, configuration, enabled flag and host application. Hooks
/// may suspend; the loader awaits them one plugin at a time.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Called once, after every declared dependency has been loaded.
    async fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Called when the plugin transitions to enabled.
    async fn on_enable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;

    /// Called when the plugin transitions to disabled.
    async fn on_disable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError>;
}

/// Export a plugin type for dynamic loading.
///
/// This macro generates the C ABI entry points that the host's library
/// resolver looks up in a plugin's shared library.
///
/// # Usage
///
/// ```ignore
/// plugin_lib_api::export_plugin!(MyPlugin);
/// ```
///
/// # Generated Functions
///
/// - `_plugin_lib_create()`: Creates a new plugin instance
/// - `_plugin_lib_api_version()`: Returns the API version
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C" fn _plugin_lib_create() -> *mut dyn $crate::Plugin {
            let plugin: Box<dyn $crate::Plugin> = Box::new(<$plugin_type>::default());
            Box::into_raw(plugin)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugin_lib_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl Plugin for Noop {
        async fn on_load(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
        async fn on_enable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
        async fn on_disable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            Ok(())
        }
    }

    export_plugin!(Noop);

    #[test]
    fn test_api_version_is_set() {
        assert_eq!(API_VERSION, 1);
    }

    #[test]
    fn test_plugin_trait_is_object_safe() {
        // This compiles only if Plugin is object-safe
        fn _takes_boxed_plugin(_: Box<dyn Plugin>) {}
    }

    #[test]
    fn test_exported_symbols() {
        assert_eq!(_plugin_lib_api_version(), API_VERSION);
        let raw = _plugin_lib_create();
        // SAFETY: pointer was produced by Box::into_raw just above
        let plugin = unsafe { Box::from_raw(raw) };
        drop(plugin);
    }
}
