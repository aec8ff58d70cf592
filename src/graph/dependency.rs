// src/graph/dependency.rs

use std::path::{Path, PathBuf};

use crate::errors::{QuickscopeError, Result};

/// A watched entry-point file (typically a test file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Path as matched by the target glob, usually relative to `cwd`.
    pub path: PathBuf,
    /// Project root the target belongs to.
    pub cwd: PathBuf,
}

impl Target {
    pub fn new(path: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cwd: cwd.into(),
        }
    }

    /// `cwd.join(path)`; absolute paths are kept as is.
    pub fn full_path(&self) -> PathBuf {
        self.cwd.join(&self.path)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "target path must not be empty".to_string(),
            ));
        }
        if self.cwd.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(format!(
                "target {:?} has no project root",
                self.path
            )));
        }
        Ok(())
    }
}

/// A file reachable from one or more targets.
///
/// `targets` is an ordered set of referencing target paths. A node whose own
/// path equals its first target is a target-as-dependency: the node the
/// store creates for the target file itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    path: PathBuf,
    cwd: PathBuf,
    targets: Vec<PathBuf>,
}

impl Dependency {
    pub fn new(path: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "dependency path must not be empty".to_string(),
            ));
        }
        Ok(Self {
            path,
            cwd: cwd.into(),
            targets: Vec::new(),
        })
    }

    /// Build a node with a given referencing set, applying the same rules
    /// as repeated [`Dependency::add_target`] calls.
    pub fn with_targets<I, P>(
        path: impl Into<PathBuf>,
        cwd: impl Into<PathBuf>,
        targets: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut dependency = Self::new(path, cwd)?;
        for target in targets {
            dependency.add_target(target)?;
        }
        Ok(dependency)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn targets(&self) -> &[PathBuf] {
        &self.targets
    }

    pub fn has_target(&self, target: &Path) -> bool {
        self.targets.iter().any(|t| t == target)
    }

    /// True when this node stands for a target file itself.
    pub fn is_target(&self) -> bool {
        self.targets.first().is_some_and(|first| *first == self.path)
    }

    /// Check whether `target` could be added without breaking the
    /// target-as-dependency rule, in either order: a target node takes no
    /// other target, and a node other targets reach cannot become a target.
    pub fn can_add_target(&self, target: &Path) -> Result<()> {
        if self.has_target(target) {
            return Ok(());
        }
        let becomes_target = target == self.path;
        if self.is_target() || (becomes_target && !self.targets.is_empty()) {
            return Err(QuickscopeError::TargetConflict {
                dependency: self.path.clone(),
                target: target.to_path_buf(),
            });
        }
        Ok(())
    }

    /// Add a referencing target. Adding a known target is a no-op.
    pub fn add_target(&mut self, target: impl Into<PathBuf>) -> Result<()> {
        let target = target.into();
        if self.has_target(&target) {
            return Ok(());
        }
        self.can_add_target(&target)?;
        self.targets.push(target);
        Ok(())
    }

    /// Keep only the referencing targets `keep` accepts.
    pub(crate) fn retain_targets(&mut self, mut keep: impl FnMut(&Path) -> bool) {
        self.targets.retain(|t| keep(t));
    }

    /// Remove a referencing target; returns whether it was present.
    pub fn remove_target(&mut self, target: &Path) -> bool {
        let before = self.targets.len();
        self.targets.retain(|t| t != target);
        self.targets.len() != before
    }
}
