use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{QuickscopeError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = QuickscopeError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let mut resolve = raw.resolve;
        resolve.extensions = resolve
            .extensions
            .iter()
            .map(|ext| ext.trim_start_matches('.').to_string())
            .collect();
        Ok(ConfigFile::new_unchecked(
            raw.files,
            raw.cmd.trim().to_string(),
            raw.config,
            resolve,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_files(cfg)?;
    validate_cmd(cfg)?;
    validate_run_config(cfg)?;
    validate_resolve(cfg)?;
    Ok(())
}

fn validate_files(cfg: &RawConfigFile) -> Result<()> {
    if cfg.files.is_empty() {
        return Err(QuickscopeError::ConfigError(
            "config must define at least one target glob in `files`".to_string(),
        ));
    }
    for pattern in cfg.files.iter() {
        if pattern.trim().is_empty() {
            return Err(QuickscopeError::ConfigError(
                "`files` contains an empty glob".to_string(),
            ));
        }
        Glob::new(pattern).map_err(|e| {
            QuickscopeError::ConfigError(format!("invalid glob in `files`: {pattern} ({e})"))
        })?;
    }
    Ok(())
}

fn validate_cmd(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cmd.trim().is_empty() {
        return Err(QuickscopeError::ConfigError(
            "config must define a non-empty `cmd`".to_string(),
        ));
    }
    Ok(())
}

fn validate_run_config(cfg: &RawConfigFile) -> Result<()> {
    // run_policy is strongly typed and validated during deserialization.
    if cfg.config.queue_length == 0 {
        return Err(QuickscopeError::ConfigError(
            "[config].queue_length must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_resolve(cfg: &RawConfigFile) -> Result<()> {
    if cfg.resolve.extensions.is_empty() {
        return Err(QuickscopeError::ConfigError(
            "[resolve].extensions must not be empty".to_string(),
        ));
    }
    if let Some(dir) = cfg
        .resolve
        .exclude
        .iter()
        .find(|d| d.is_empty() || d.contains('/') || d.contains('\\'))
    {
        return Err(QuickscopeError::ConfigError(format!(
            "[resolve].exclude entries must be plain directory names (got {dir:?})"
        )));
    }
    Ok(())
}
