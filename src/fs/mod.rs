// src/fs/mod.rs

//! Filesystem access used by the resolver, the target scan and content
//! hashing, behind a trait so tests can run against [`mock::MockFileSystem`].

use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub mod mock;

/// What a path points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

pub trait FileSystem: Send + Sync + Debug {
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Streaming read, used for hashing.
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;

    /// `None` if nothing exists at `path`. Symlinks are followed.
    fn kind(&self, path: &Path) -> Option<EntryKind>;

    /// Full paths of the entries of `dir`, sorted.
    fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    fn exists(&self, path: &Path) -> bool {
        self.kind(path).is_some()
    }

    fn is_file(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::File)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.kind(path) == Some(EntryKind::Dir)
    }
}

/// The real disk.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Ok(Box::new(file))
    }

    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let meta = fs::metadata(path).ok()?;
        Some(if meta.is_dir() {
            EntryKind::Dir
        } else {
            EntryKind::File
        })
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).with_context(|| format!("cannot list {}", dir.display()))?;
        // Entries that vanish while listing are skipped.
        let mut paths: Vec<PathBuf> = entries.filter_map(|e| e.ok()).map(|e| e.path()).collect();
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_fs_kinds_and_sorted_listing() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.js"), "").unwrap();
        fs::write(dir.path().join("a.js"), "").unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();

        let real = RealFileSystem;
        assert_eq!(real.kind(&dir.path().join("lib")), Some(EntryKind::Dir));
        assert!(real.is_file(&dir.path().join("a.js")));
        assert!(!real.exists(&dir.path().join("c.js")));
        assert_eq!(
            real.read_dir(dir.path()).unwrap(),
            vec![dir.path().join("a.js"), dir.path().join("b.js"), dir.path().join("lib")]
        );
    }
}
