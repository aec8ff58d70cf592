// src/watch/targets.rs

//! Target discovery: the `files` glob set, the initial scan of the project
//! tree and the recursive watcher that reports target creation/removal.

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::RuntimeEvent;
use crate::errors::{QuickscopeError, Result};
use crate::fs::FileSystem;
use crate::watch::event::classify;
use crate::watch::path_utils::{is_excluded, relative_str};

/// Directories never descended into during the initial scan, on top of the
/// configured exclusions.
const SKIP_DIRS: &[&str] = &[".git", ".hg"];

/// Compiled `files` globs, evaluated against paths relative to the root.
#[derive(Clone)]
pub struct TargetMatcher {
    root: PathBuf,
    globs: GlobSet,
    patterns: Vec<String>,
    exclude: Vec<String>,
}

impl fmt::Debug for TargetMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetMatcher")
            .field("root", &self.root)
            .field("patterns", &self.patterns)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl TargetMatcher {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String], exclude: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                QuickscopeError::ConfigError(format!("invalid glob in `files`: {pattern} ({e})"))
            })?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .map_err(|e| QuickscopeError::ConfigError(format!("building target globs: {e}")))?;

        Ok(Self {
            root: root.into(),
            globs,
            patterns: patterns.to_vec(),
            exclude: exclude.to_vec(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// If `path` is a target, return it relative to the root.
    pub fn matches(&self, path: &Path) -> Option<PathBuf> {
        let full = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        if is_excluded(&self.root, &full, &self.exclude) {
            return None;
        }
        let rel = relative_str(&self.root, &full)?;
        self.globs.is_match(&rel).then(|| PathBuf::from(rel))
    }

    /// Walk the project tree and return every existing target, relative to
    /// the root, sorted.
    pub fn scan(&self, fs: &dyn FileSystem) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let entries = match fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "could not scan directory");
                    continue;
                }
            };
            for entry in entries {
                if fs.is_dir(&entry) {
                    let skip = entry
                        .file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(|name| SKIP_DIRS.contains(&name) || self.exclude.iter().any(|e| e == name));
                    if !skip {
                        pending.push(entry);
                    }
                } else if let Some(rel) = self.matches(&entry) {
                    found.push(rel);
                }
            }
        }

        found.sort();
        debug!(root = ?self.root, targets = found.len(), "initial scan complete");
        found
    }
}

/// Keeps the recursive target watcher alive; dropping it stops watching.
pub struct TargetWatcherHandle {
    _inner: RecommendedWatcher,
}

impl fmt::Debug for TargetWatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetWatcherHandle").finish()
    }
}

/// Watch `root` recursively and forward every classified event as
/// [`RuntimeEvent::TargetFs`]. Filtering against the globs happens in the
/// controller.
pub fn spawn_target_watcher(
    root: &Path,
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
) -> Result<TargetWatcherHandle> {
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for fs_event in classify(&event, Path::exists) {
                    let _ = runtime_tx.send(RuntimeEvent::TargetFs(fs_event));
                }
            }
            Err(err) => warn!(error = %err, "target watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(root, RecursiveMode::Recursive)?;
    info!("watching for targets under {:?}", root);

    Ok(TargetWatcherHandle { _inner: watcher })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn matcher(patterns: &[&str]) -> TargetMatcher {
        let patterns: Vec<String> = patterns.iter().map(|s| s.to_string()).collect();
        TargetMatcher::new("/p", &patterns, &["node_modules".to_string()]).unwrap()
    }

    #[test]
    fn matches_relative_and_absolute_paths() {
        let m = matcher(&["test/**/*-test.js"]);
        assert_eq!(
            m.matches(Path::new("/p/test/unit/a-test.js")),
            Some(PathBuf::from("test/unit/a-test.js"))
        );
        assert_eq!(
            m.matches(Path::new("test/b-test.js")),
            Some(PathBuf::from("test/b-test.js"))
        );
        assert_eq!(m.matches(Path::new("/p/lib/a.js")), None);
    }

    #[test]
    fn excluded_directories_never_match() {
        let m = matcher(&["**/*-test.js"]);
        assert_eq!(m.matches(Path::new("/p/node_modules/x/a-test.js")), None);
    }

    #[test]
    fn scan_finds_targets_and_skips_excluded() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/test/b-test.js", "");
        fs.add_file("/p/test/a-test.js", "");
        fs.add_file("/p/test/helper.js", "");
        fs.add_file("/p/node_modules/pkg/test/c-test.js", "");

        let m = matcher(&["**/*-test.js"]);
        assert_eq!(
            m.scan(&fs),
            vec![PathBuf::from("test/a-test.js"), PathBuf::from("test/b-test.js")]
        );
    }
}
