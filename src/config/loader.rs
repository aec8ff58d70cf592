use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{QuickscopeError, Result};

/// Files/directories whose presence marks a project root.
pub const ROOT_MARKERS: &[&str] = &[".git", ".hg", "package.json", "Quickscope.toml"];

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// `*.json` files are read as a `package.json` and the `config.quickscope`
/// object is used; anything else is parsed as TOML. No semantic validation
/// happens here, use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        return raw_config_from_package_json(&contents);
    }

    let config: RawConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and run validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

fn raw_config_from_package_json(contents: &str) -> Result<RawConfigFile> {
    let mut package: serde_json::Value = serde_json::from_str(contents)?;
    let section = package
        .get_mut("config")
        .and_then(|c| c.get_mut("quickscope"))
        .map(serde_json::Value::take)
        .ok_or_else(|| {
            QuickscopeError::ConfigError(
                "package.json has no `config.quickscope` object".to_string(),
            )
        })?;
    Ok(serde_json::from_value(section)?)
}

/// Walk up from `start` to the first directory containing one of
/// [`ROOT_MARKERS`]. Falls back to `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|marker| dir.join(marker).exists()))
        .unwrap_or(start)
        .to_path_buf()
}
