// src/resolve/mod.rs

//! Static dependency resolution.
//!
//! A [`DependencyResolver`] turns one file into the flat list of files it
//! transitively imports. The store only ever talks to the trait;
//! [`ImportResolver`] is the production implementation for JavaScript and
//! TypeScript sources.

use std::path::{Path, PathBuf};

use crate::errors::Result;

pub mod import;
pub mod scanner;

pub use import::ImportResolver;

pub trait DependencyResolver {
    /// Resolve `file` within the project rooted at `root`.
    ///
    /// Returns absolute paths, dependencies before their dependents and
    /// `file` itself last. Files under excluded (vendored) directories are
    /// never returned. A file that cannot be read or parsed yields
    /// [`crate::errors::QuickscopeError::ParseFailure`].
    fn resolve(&self, root: &Path, file: &Path) -> Result<Vec<PathBuf>>;
}
