use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

use crate::pipeline::source::discover_sources;
use crate::util::mtime_secs;

/// Fingerprint of the source directory used to decide whether stored
/// records are stale: SHA-256 over each source file's name, size and
/// modification time (whole seconds), in sorted file-name order. File
/// contents are never read.
pub fn corpus_signature(source_dir: &Path) -> Result<String> {
    let mut hasher = Sha256::new();

    for path in discover_sources(source_dir)? {
        let metadata = fs::metadata(&path)
            .with_context(|| format!("failed to stat {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        hasher.update(file_name.as_bytes());
        hasher.update(metadata.len().to_string().as_bytes());
        hasher.update(mtime_secs(&metadata).to_string().as_bytes());
    }

    Ok(format!("{:x}", hasher.finalize()))
}
