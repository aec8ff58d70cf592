// src/watch/hash.rs

use std::io;
use std::path::Path;

use anyhow::{Context, Result};

use crate::fs::FileSystem;

/// blake3 digest of a file's bytes, streamed through `fs`.
pub fn content_hash(fs: &dyn FileSystem, path: &Path) -> Result<blake3::Hash> {
    let mut reader = fs.open_read(path)?;
    let mut hasher = blake3::Hasher::new();
    io::copy(&mut reader, &mut hasher).with_context(|| format!("hashing {}", path.display()))?;
    Ok(hasher.finalize())
}
