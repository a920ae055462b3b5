//! Hello Plugin - A simple example plugin for plugin-lib
//!
//! This plugin demonstrates:
//! - Basic plugin structure with the `export_plugin!` macro
//! - Implementing the `Plugin` trait
//! - Reading `config.toml` values through the context
//! - Counting how often it was switched on
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.config/plugin-lib/plugins/hello
//! cp package.json ~/.config/plugin-lib/plugins/hello/
//! cp target/release/libhello_plugin.so ~/.config/plugin-lib/plugins/hello/
//! plugin-lib run
//! ```

use plugin_lib_api::{Plugin, PluginContext, PluginError, async_trait, export_plugin};

/// Greets on enable, using `greeting` from config.toml if present.
#[derive(Default)]
pub struct HelloPlugin {
    /// Times the plugin was enabled
    enable_count: u32,
    greeting: String,
}

#[async_trait]
impl Plugin for HelloPlugin {
    async fn on_load(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        self.greeting = ctx
            .config_get::<String>("greeting")
            .unwrap_or_else(|| "Hello".to_string());
        ctx.log_info(&format!(
            "Hello plugin loaded by {} {}",
            ctx.application().name(),
            ctx.application().version()
        ));
        Ok(())
    }

    async fn on_enable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        self.enable_count += 1;
        ctx.log_info(&format!(
            "{}, world! (enabled {} time(s))",
            self.greeting, self.enable_count
        ));
        Ok(())
    }

    async fn on_disable(&mut self, ctx: &mut PluginContext) -> Result<(), PluginError> {
        ctx.log_info("Goodbye!");
        Ok(())
    }
}

// This macro generates the C ABI entry points for dynamic loading
export_plugin!(HelloPlugin);
