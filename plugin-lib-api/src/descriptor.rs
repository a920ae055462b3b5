//! Plugin descriptor - the parsed `package.json` manifest of a plugin

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the manifest file inside every plugin directory
pub const DESCRIPTOR_FILE: &str = "package.json";

/// When a loaded plugin should be enabled by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum LoadPhase {
    /// Enabled while the host application starts up
    #[default]
    Startup,
    /// Enabled once the host application has finished starting
    PostStart,
}

impl TryFrom<u8> for LoadPhase {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Startup),
            1 => Ok(Self::PostStart),
            other => Err(format!("invalid load phase {other}, expected 0 or 1")),
        }
    }
}

impl From<LoadPhase> for u8 {
    fn from(phase: LoadPhase) -> Self {
        match phase {
            LoadPhase::Startup => 0,
            LoadPhase::PostStart => 1,
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.pad("STARTUP"),
            Self::PostStart => f.pad("POSTSTART"),
        }
    }
}

/// Plugin author metadata. Informational only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Plugin manifest containing identity, entry point and dependencies
///
/// Deserialized from the plugin's `package.json`. Unknown keys (scripts,
/// devDependencies, ...) are ignored so regular package manifests can be
/// reused as plugin descriptors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin name, the registry key. Empty when the manifest omits it.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Plugin version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Entry point, relative to the plugin directory
    pub main: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<Author>,
    /// Declared load phase; see [`PluginDescriptor::load_phase`]
    #[serde(
        rename = "plugin-lib$load",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub load: Option<LoadPhase>,
    /// Names of plugins that must be loaded first
    #[serde(
        rename = "plugin-lib$depends",
        default,
        deserialize_with = "null_as_default"
    )]
    pub depends: Vec<String>,
}

/// Treat an explicit `null` like an absent key
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl PluginDescriptor {
    /// Create a descriptor with the given name and entry point
    pub fn new(name: impl Into<String>, main: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            main: main.into(),
            author: None,
            authors: Vec::new(),
            load: None,
            depends: Vec::new(),
        }
    }

    /// Builder: set the dependency list
    pub fn with_depends<I, S>(mut self, depends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = depends.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the load phase
    pub fn with_load_phase(mut self, phase: LoadPhase) -> Self {
        self.load = Some(phase);
        self
    }

    /// Parse a descriptor from manifest JSON
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// The load phase, resolving an unset phase to [`LoadPhase::Startup`]
    pub fn load_phase(&self) -> LoadPhase {
        self.load.unwrap_or_default()
    }

    /// Whether the manifest carries a usable name
    pub fn has_name(&self) -> bool {
        !self.name.trim().is_empty()
    }
}
