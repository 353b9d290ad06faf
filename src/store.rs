use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::artifact::{Artifact, ArtifactRef};
use crate::error::{ChartError, Result};

/// What `persist` did with the bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Written,
    /// Same content was already stored under the same name
    AlreadyPresent,
}

/// Content-addressed directory of rendered charts.
///
/// File names derive from the image hash, so storing identical bytes twice
/// yields the same reference and concurrent writers never see a torn file.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// The directory is created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self, artifact: &Artifact) -> Result<ArtifactRef> {
        self.persist(artifact).map(|(r, _)| r)
    }

    pub fn persist(&self, artifact: &Artifact) -> Result<(ArtifactRef, StoreOutcome)> {
        let id = artifact.file_name();
        let path = self.root.join(&id);

        let outcome = if path.is_file() {
            debug!(id = %id, "artifact already stored");
            StoreOutcome::AlreadyPresent
        } else {
            fs::create_dir_all(&self.root).map_err(|e| self.unavailable(e))?;
            self.write_atomic(&path, &artifact.bytes)
                .map_err(|e| self.unavailable(e))?;
            info!(id = %id, bytes = artifact.bytes.len(), "stored artifact");
            StoreOutcome::Written
        };

        let reference = ArtifactRef {
            id,
            path,
            content_hash: artifact.content_hash.clone(),
            kind: artifact.kind,
            format: artifact.format,
            rows_rendered: artifact.rows_rendered,
        };
        Ok((reference, outcome))
    }

    /// Write into a temp file beside `path` then rename over it
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Look up a stored artifact by the id carried in a reply marker.
    ///
    /// Ids that are not plain file names never resolve.
    pub fn resolve(&self, id: &str) -> Option<PathBuf> {
        let valid = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            && !id.starts_with('.');
        if !valid {
            return None;
        }
        let path = self.root.join(id);
        path.is_file().then_some(path)
    }

    fn unavailable(&self, source: io::Error) -> ChartError {
        ChartError::StorageUnavailable {
            path: self.root.clone(),
            source,
        }
    }
}
