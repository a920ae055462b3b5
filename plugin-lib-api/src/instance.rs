//! PluginInstance - a constructed plugin paired with its lifecycle state

use crate::Plugin;
use crate::context::PluginContext;
use crate::descriptor::PluginDescriptor;
use crate::error::PluginError;
use std::fmt;
use std::path::Path;

/// Lifecycle state of a plugin instance
///
/// `Unloaded` only exists until `on_load` has completed; after that a
/// plugin toggles between `Enabled` and `Disabled` and never returns to
/// `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginState {
    Unloaded,
    Enabled,
    Disabled,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unloaded => f.write_str("unloaded"),
            Self::Enabled => f.write_str("enabled"),
            Self::Disabled => f.write_str("disabled"),
        }
    }
}

/// A plugin together with the context its hooks operate on
pub struct PluginInstance {
    plugin: Box<dyn Plugin>,
    context: PluginContext,
    loaded: bool,
}

impl PluginInstance {
    pub fn new(plugin: Box<dyn Plugin>, context: PluginContext) -> Self {
        Self {
            plugin,
            context,
            loaded: false,
        }
    }

    pub fn name(&self) -> &str {
        self.context.plugin_name()
    }

    pub fn description(&self) -> &PluginDescriptor {
        self.context.description()
    }

    /// Directory the plugin was loaded from
    pub fn file(&self) -> &Path {
        self.context.plugin_dir()
    }

    pub fn context(&self) -> &PluginContext {
        &self.context
    }

    pub fn is_enabled(&self) -> bool {
        self.context.is_enabled()
    }

    pub fn state(&self) -> PluginState {
        match (self.loaded, self.context.is_enabled()) {
            (false, _) => PluginState::Unloaded,
            (true, true) => PluginState::Enabled,
            (true, false) => PluginState::Disabled,
        }
    }

    /// Run `on_load`. Only the first successful call has an effect.
    pub async fn load(&mut self) -> Result<(), PluginError> {
        if self.loaded {
            return Ok(());
        }
        self.plugin.on_load(&mut self.context).await?;
        self.loaded = true;
        Ok(())
    }

    /// Enable or disable the plugin
    ///
    /// Requesting the current state is a no-op that never calls a hook.
    /// Otherwise the matching hook runs and the flag flips only once it
    /// has succeeded; hook errors are returned unchanged.
    pub async fn set_enabled(&mut self, enabled: bool) -> Result<(), PluginError> {
        if self.context.is_enabled() == enabled {
            return Ok(());
        }
        if enabled {
            self.plugin.on_enable(&mut self.context).await?;
        } else {
            self.plugin.on_disable(&mut self.context).await?;
        }
        self.context.set_enabled_flag(enabled);
        Ok(())
    }

    /// Re-read the plugin's `config.toml`
    pub fn reload_config(&mut self) -> Result<(), PluginError> {
        self.context.reload_config()
    }
}

impl fmt::Display for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<enabled: {}>", self.name(), self.is_enabled())
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("context", &self.context)
            .field("loaded", &self.loaded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::BasicApplication;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<&'static str>>>,
        fail_enable: bool,
    }

    #[async_trait]
    impl Plugin for Recorder {
        async fn on_load(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            self.calls.lock().unwrap().push("load");
            Ok(())
        }

        async fn on_enable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            self.calls.lock().unwrap().push("enable");
            if self.fail_enable {
                return Err(PluginError::custom("enable refused"));
            }
            Ok(())
        }

        async fn on_disable(&mut self, _ctx: &mut PluginContext) -> Result<(), PluginError> {
            self.calls.lock().unwrap().push("disable");
            Ok(())
        }
    }

    fn instance(plugin: Recorder) -> PluginInstance {
        let context = PluginContext::new(
            Arc::new(BasicApplication::new("host", "1.0.0")),
            PluginDescriptor::new("recorder", "recorder.so"),
            PathBuf::from("/plugins/recorder"),
        );
        PluginInstance::new(Box::new(plugin), context)
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let mut plugin = instance(Recorder::default());
        assert_eq!(plugin.state(), PluginState::Unloaded);

        plugin.load().await.unwrap();
        assert_eq!(plugin.state(), PluginState::Disabled);

        plugin.set_enabled(true).await.unwrap();
        assert_eq!(plugin.state(), PluginState::Enabled);

        plugin.set_enabled(false).await.unwrap();
        assert_eq!(plugin.state(), PluginState::Disabled);
    }

    #[tokio::test]
    async fn test_load_runs_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut plugin = instance(Recorder {
            calls: calls.clone(),
            fail_enable: false,
        });

        plugin.load().await.unwrap();
        plugin.load().await.unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), ["load"]);
    }

    #[tokio::test]
    async fn test_set_enabled_same_state_skips_hook() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut plugin = instance(Recorder {
            calls: calls.clone(),
            fail_enable: false,
        });

        // Already disabled
        plugin.set_enabled(false).await.unwrap();
        assert!(calls.lock().unwrap().is_empty());

        plugin.set_enabled(true).await.unwrap();
        plugin.set_enabled(true).await.unwrap();
        assert_eq!(calls.lock().unwrap().as_slice(), ["enable"]);
    }

    #[tokio::test]
    async fn test_failed_enable_keeps_flag() {
        let mut plugin = instance(Recorder {
            calls: Arc::default(),
            fail_enable: true,
        });

        let result = plugin.set_enabled(true).await;
        assert!(matches!(result, Err(PluginError::Custom(_))));
        assert!(!plugin.is_enabled());
    }

    #[test]
    fn test_display() {
        let plugin = instance(Recorder::default());
        assert_eq!(plugin.to_string(), "recorder<enabled: false>");
    }
}
