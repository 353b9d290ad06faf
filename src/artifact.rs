use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

use crate::intent::ChartKind;
use crate::OutputFormat;

/// Encoded image produced by a chart builder, not yet persisted.
#[derive(Clone)]
pub struct Artifact {
    pub kind: ChartKind,
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`
    pub content_hash: String,
    /// Rows that survived null exclusion and were drawn
    pub rows_rendered: usize,
}

impl Artifact {
    pub fn new(kind: ChartKind, format: OutputFormat, bytes: Vec<u8>, rows_rendered: usize) -> Self {
        let content_hash = content_hash(&bytes);
        Self {
            kind,
            format,
            bytes,
            content_hash,
            rows_rendered,
        }
    }

    /// Content-addressed file name: `<kind>_<16 hex>.<ext>`
    pub fn file_name(&self) -> String {
        let short = self.content_hash.get(..16).unwrap_or(&self.content_hash);
        format!("{}_{}.{}", self.kind, short, self.format.extension())
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("kind", &self.kind)
            .field("format", &self.format)
            .field("bytes", &self.bytes.len())
            .field("content_hash", &self.content_hash)
            .field("rows_rendered", &self.rows_rendered)
            .finish()
    }
}

pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Handle returned to the caller once an artifact is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactRef {
    /// File name inside the store, also what a reply marker carries
    pub id: String,
    pub path: PathBuf,
    pub content_hash: String,
    pub kind: ChartKind,
    pub format: OutputFormat,
    pub rows_rendered: usize,
}

impl ArtifactRef {
    /// Marker the agent embeds in its reply so the UI can show the image inline
    pub fn marker(&self) -> String {
        format!("[VIZ:{}]", self.id)
    }
}
