//! Local staging area for unverified uploads.
//!
//! Uploaded bytes are buffered on disk until their digest has been checked
//! against the client-declared hash.  Staging paths are keyed by a
//! per-request UUID token, never by the client-declared name, so concurrent
//! uploads declaring the same name can never interleave writes.
//!
//! A [`StagedFile`] owns its path for its whole lifetime: it is removed
//! explicitly by the pipeline and, as a backstop, on drop.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::errors::GatewayError;

/// Manages scratch files under a dedicated directory.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create a staging area rooted at `root`.
    ///
    /// The directory is created if it does not exist.
    pub fn new(root: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Allocate a fresh staging file for an upload declaring `name`.
    ///
    /// The on-disk path is `<root>/<uuid>-<name>`; the token guarantees
    /// isolation between concurrent uploads regardless of the declared name.
    pub fn create(&self, name: &str) -> Result<StagedFile, GatewayError> {
        validate_name(name)?;
        let token = uuid::Uuid::new_v4();
        let path = self.root.join(format!("{token}-{name}"));
        Ok(StagedFile { path })
    }

    /// Append `data` to a fixed file under the staging root.
    ///
    /// Used by the legacy write endpoint, which targets a well-known file
    /// instead of the verified pipeline.
    pub fn append_fixed(&self, name: &str, data: &[u8]) -> Result<PathBuf, GatewayError> {
        validate_name(name)?;
        let path = self.root.join(name);
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(anyhow::Error::from)?;
        file.write_all(data).map_err(anyhow::Error::from)?;
        Ok(path)
    }
}

/// Reject names that cannot be used as a single path component.
fn validate_name(name: &str) -> Result<(), GatewayError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(GatewayError::InvalidStagingName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Bytes temporarily resident in the staging area.
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
}

impl StagedFile {
    /// The on-disk location of the staged bytes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the full upload body to the staging file.
    pub fn write(&self, data: &[u8]) -> anyhow::Result<()> {
        let mut file = File::create(&self.path)?;
        file.write_all(data)?;
        file.sync_all()?;
        Ok(())
    }

    /// Compute the SHA-256 digest of the staged file's contents, as
    /// lowercase hex, reading in 8 KiB chunks.
    pub fn sha256_hex(&self) -> anyhow::Result<String> {
        let mut file = File::open(&self.path)?;
        let mut hasher = Sha256::new();
        let mut buffer = [0u8; 8192];
        loop {
            let n = file.read(&mut buffer)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
        Ok(hex::encode(hasher.finalize()))
    }

    /// Read the staged bytes back for commit.
    pub fn read_all(&self) -> anyhow::Result<Vec<u8>> {
        Ok(std::fs::read(&self.path)?)
    }

    /// Remove the staging file.
    pub fn remove(self) {
        // Drop does the actual removal.
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                warn!(path = %self.path.display(), error = %err, "failed to remove staged file");
            }
        }
    }
}
