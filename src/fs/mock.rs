// src/fs/mock.rs

use super::{EntryKind, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::BTreeMap;
use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory filesystem. Directories exist implicitly as ancestors of the
/// files that were added.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or overwrite a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        self.lock()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Delete a file; returns whether it existed.
    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        self.lock().remove(path.as_ref()).is_some()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn file(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.lock();
        match files.get(path) {
            Some(content) => Ok(content.clone()),
            None if has_children(&files, path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}

fn has_children(files: &BTreeMap<PathBuf, Vec<u8>>, dir: &Path) -> bool {
    files.keys().any(|p| p != dir && p.starts_with(dir))
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let content = self.file(path)?;
        String::from_utf8(content).map_err(|e| anyhow!("Invalid UTF-8: {}", e))
    }

    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(Cursor::new(self.file(path)?)))
    }

    fn kind(&self, path: &Path) -> Option<EntryKind> {
        let files = self.lock();
        if files.contains_key(path) {
            Some(EntryKind::File)
        } else if has_children(&files, path) {
            Some(EntryKind::Dir)
        } else {
            None
        }
    }

    fn read_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let files = self.lock();
        let mut children: Vec<PathBuf> = files
            .keys()
            .filter_map(|p| p.strip_prefix(dir).ok())
            .filter_map(|rel| match rel.components().next() {
                Some(Component::Normal(name)) => Some(dir.join(name)),
                _ => None,
            })
            .collect();
        children.dedup();
        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", dir));
        }
        Ok(children)
    }
}
