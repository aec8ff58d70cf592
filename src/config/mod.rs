// src/config/mod.rs

//! Configuration loading and validation for quickscope.
//!
//! Responsibilities:
//! - Define the TOML/JSON-backed data model (`model.rs`).
//! - Load a config file from disk and locate the project root (`loader.rs`).
//! - Validate globs, command and run options (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{find_project_root, load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, ResolveSection};
