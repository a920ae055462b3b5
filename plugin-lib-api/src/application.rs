//! Host application and logging contracts
//!
//! The hosting application owns process identity and the log sink. The
//! plugin loader and every plugin context receive it as an explicit
//! `Arc<dyn Application>` instead of reaching it through back-references.

use std::error::Error;

/// Log sink used by the loader and by plugins
///
/// Only the message-level methods are required. `error_source` renders an
/// error together with its source chain.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn trace(&self, message: &str);

    /// Log an error value, including its chain of sources
    fn error_source(&self, error: &dyn Error) {
        self.error(&render_error(error));
    }
}

/// The application hosting the plugin loader
pub trait Application: Send + Sync {
    /// Application name, used as the log target
    fn name(&self) -> &str;

    /// Application version
    fn version(&self) -> &str {
        "0.0.0"
    }

    /// The application's log sink
    fn logger(&self) -> &dyn Logger;
}

/// Render an error and its `source()` chain as `outer: inner: root`
///
/// A source whose message the rendering already ends with is skipped, so
/// `#[error("...: {0}")]` wrappers are not printed twice.
pub fn render_error(error: &dyn Error) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let message = cause.to_string();
        if !rendered.ends_with(&message) {
            rendered.push_str(": ");
            rendered.push_str(&message);
        }
        source = cause.source();
    }
    rendered
}

/// [`Logger`] that forwards to `tracing`
#[derive(Debug, Clone)]
pub struct TracingLogger {
    target: String,
}

impl TracingLogger {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }
}

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        tracing::error!(target: "plugin_lib", app = %self.target, "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "plugin_lib", app = %self.target, "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "plugin_lib", app = %self.target, "{}", message);
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "plugin_lib", app = %self.target, "{}", message);
    }

    fn trace(&self, message: &str) {
        tracing::trace!(target: "plugin_lib", app = %self.target, "{}", message);
    }
}

/// Minimal [`Application`] that logs through `tracing`
#[derive(Debug, Clone)]
pub struct BasicApplication {
    name: String,
    version: String,
    logger: TracingLogger,
}

impl BasicApplication {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            logger: TracingLogger::new(name.clone()),
            name,
            version: version.into(),
        }
    }
}

impl Application for BasicApplication {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn logger(&self) -> &dyn Logger {
        &self.logger
    }
}
