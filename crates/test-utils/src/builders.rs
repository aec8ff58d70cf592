#![allow(dead_code)]

use quickscope::config::{ConfigFile, ConfigSection, RawConfigFile, ResolveSection};
use quickscope::types::RunPolicy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            config: RawConfigFile {
                files: Vec::new(),
                cmd: cmd.to_string(),
                config: ConfigSection::default(),
                resolve: ResolveSection::default(),
            },
        }
    }

    pub fn with_files(mut self, pattern: &str) -> Self {
        self.config.files.push(pattern.to_string());
        self
    }

    pub fn with_run_policy(mut self, policy: RunPolicy) -> Self {
        self.config.config.run_policy = policy;
        self
    }

    pub fn with_queue_length(mut self, len: usize) -> Self {
        self.config.config.queue_length = len;
        self
    }

    pub fn with_use_hash(mut self, val: bool) -> Self {
        self.config.config.use_hash = val;
        self
    }

    pub fn with_exclude(mut self, dir: &str) -> Self {
        self.config.resolve.exclude.push(dir.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
