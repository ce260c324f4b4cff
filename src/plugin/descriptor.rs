//! Plugin descriptor embedded in a plugin archive
//!
//! A plugin artifact is a gzip'd tar archive carrying `savant-plugin.toml`
//! (optionally under `META-INF/`):
//!
//! ```toml
//! plugin-class = "org.savantbuild.plugin.dependency.DependencyPlugin"
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use serde::Deserialize;
use tar::Archive;

use super::PluginLoadError;

pub const DESCRIPTOR_NAME: &str = "savant-plugin.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PluginDescriptor {
    plugin_class: Option<String>,
}

/// Reads the plugin type name from the archive at `path`
pub fn read_plugin_class(path: &Path, plugin: &str) -> Result<String, PluginLoadError> {
    let unreadable = |source| PluginLoadError::Unreadable {
        plugin: plugin.to_string(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let mut archive = Archive::new(GzDecoder::new(file));

    let mut contents = None;
    for entry in archive.entries().map_err(unreadable)? {
        let mut entry = entry.map_err(unreadable)?;
        let entry_path = entry.path().map_err(unreadable)?.into_owned();
        let is_descriptor = entry_path == Path::new(DESCRIPTOR_NAME)
            || entry_path == Path::new("META-INF").join(DESCRIPTOR_NAME);
        if !is_descriptor {
            continue;
        }

        let mut text = String::new();
        entry.read_to_string(&mut text).map_err(unreadable)?;
        contents = Some(text);
        break;
    }

    let contents = contents.ok_or_else(|| PluginLoadError::MissingDescriptor {
        plugin: plugin.to_string(),
    })?;

    let descriptor: PluginDescriptor = toml::from_str(&contents).map_err(|e| PluginLoadError::InvalidDescriptor {
        plugin: plugin.to_string(),
        message: e.to_string(),
    })?;

    descriptor
        .plugin_class
        .filter(|class| !class.trim().is_empty())
        .ok_or_else(|| PluginLoadError::MissingPluginClass {
            plugin: plugin.to_string(),
        })
}
