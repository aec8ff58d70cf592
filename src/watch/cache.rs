// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::content_hash;

/// Last seen content hash per watched file.
///
/// Used to drop change notifications that did not change the bytes on disk
/// (touch, editors rewriting identical content).
#[derive(Debug)]
pub struct ContentHashes {
    fs: Arc<dyn FileSystem>,
    hashes: HashMap<PathBuf, blake3::Hash>,
}

impl ContentHashes {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            hashes: HashMap::new(),
        }
    }

    /// Remember the current hash of `path`. Unreadable files are not recorded.
    pub fn record(&mut self, path: &Path) {
        match content_hash(self.fs.as_ref(), path) {
            Ok(hash) => {
                self.hashes.insert(path.to_path_buf(), hash);
            }
            Err(e) => debug!(file = ?path, error = %e, "no initial hash"),
        }
    }

    /// Re-hash `path` and report whether its content differs from the last
    /// recorded hash. A file that cannot be hashed counts as changed.
    pub fn changed(&mut self, path: &Path) -> bool {
        let hash = match content_hash(self.fs.as_ref(), path) {
            Ok(hash) => hash,
            Err(e) => {
                debug!(file = ?path, error = %e, "hashing failed, assuming change");
                self.hashes.remove(path);
                return true;
            }
        };
        match self.hashes.insert(path.to_path_buf(), hash) {
            Some(previous) => previous != hash,
            None => true,
        }
    }

    pub fn forget(&mut self, path: &Path) {
        if self.hashes.remove(path).is_some() {
            debug!(file = ?path, "hash forgotten");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn same_bytes_are_not_a_change() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.js", "one");
        let mut hashes = ContentHashes::new(Arc::new(fs.clone()));
        let path = Path::new("/p/a.js");

        hashes.record(path);
        assert!(!hashes.changed(path));

        fs.add_file("/p/a.js", "two");
        assert!(hashes.changed(path));
        assert!(!hashes.changed(path));
    }

    #[test]
    fn unknown_file_counts_as_changed() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/a.js", "one");
        let mut hashes = ContentHashes::new(Arc::new(fs));
        assert!(hashes.changed(Path::new("/p/a.js")));
    }
}
