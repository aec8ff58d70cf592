// src/config/model.rs

use serde::{Deserialize, Deserializer};

use crate::types::RunPolicy;

/// Configuration as read from `Quickscope.toml` (or the `config.quickscope`
/// object of a `package.json`), before validation.
///
/// ```toml
/// files = ["test/**/*-test.js"]
/// cmd = "mocha {targets}"
///
/// [config]
/// run_policy = "queue"
/// queue_length = 1
///
/// [resolve]
/// exclude = ["node_modules"]
/// ```
///
/// `files` also accepts a single string, matching the `package.json` form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    /// Glob(s) selecting the target files, relative to the project root.
    #[serde(default, deserialize_with = "one_or_many")]
    pub files: Vec<String>,

    /// Command template run for affected targets.
    #[serde(default)]
    pub cmd: String,

    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub resolve: ResolveSection,
}

/// `[config]` section: run behaviour.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// `"queue"` (default), `"cancel"` or `"concurrent"`.
    #[serde(default)]
    pub run_policy: RunPolicy,

    /// Maximum number of runs waiting behind an in-flight one
    /// (`run_policy = "queue"` only).
    #[serde(default = "default_queue_length")]
    pub queue_length: usize,

    /// Skip change notifications whose file content hash did not change.
    #[serde(default)]
    pub use_hash: bool,

    /// Run every target once when the initial scan completes.
    #[serde(default)]
    pub run_on_ready: bool,
}

fn default_queue_length() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            run_policy: RunPolicy::default(),
            queue_length: default_queue_length(),
            use_hash: false,
            run_on_ready: false,
        }
    }
}

/// `[resolve]` section: how dependency lists are derived.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveSection {
    /// Directory names treated as vendored code: never followed by the
    /// resolver and never matched as targets.
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,

    /// File extensions tried, in order, when an import omits one.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

pub fn default_exclude() -> Vec<String> {
    vec!["node_modules".to_string()]
}

pub fn default_extensions() -> Vec<String> {
    ["js", "mjs", "cjs", "jsx", "ts", "tsx", "json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ResolveSection {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            extensions: default_extensions(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see `validate.rs`),
/// so holders can rely on non-empty globs and command.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    files: Vec<String>,
    cmd: String,
    config: ConfigSection,
    resolve: ResolveSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        files: Vec<String>,
        cmd: String,
        config: ConfigSection,
        resolve: ResolveSection,
    ) -> Self {
        Self {
            files,
            cmd,
            config,
            resolve,
        }
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn resolve(&self) -> &ResolveSection {
        &self.resolve
    }
}
