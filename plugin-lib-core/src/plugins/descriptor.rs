//! Descriptor reader - loads a plugin directory's manifest

use std::io::ErrorKind;
use std::path::Path;

use plugin_lib_api::{Logger, PluginDescriptor};

use super::error::PluginHostError;

/// Read and parse the descriptor `file_name` inside `dir`
///
/// A missing file or malformed content is reported as
/// [`PluginHostError::InvalidDescription`]; other I/O failures are passed
/// through. The descriptor is returned as parsed, the name is not checked.
pub async fn read_descriptor(
    dir: &Path,
    file_name: &str,
    logger: &dyn Logger,
) -> Result<PluginDescriptor, PluginHostError> {
    let path = dir.join(file_name);
    logger.trace(&format!("Load {}", path.display()));

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(PluginHostError::InvalidDescription {
                reason: format!("plugin description file missing in {}", dir.display()),
                path,
            });
        }
        Err(e) => return Err(e.into()),
    };

    PluginDescriptor::from_json(&content).map_err(|e| PluginHostError::InvalidDescription {
        reason: format!("bad syntax: {e}"),
        path,
    })
}
