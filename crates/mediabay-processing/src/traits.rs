//! Capability seams of the ingest pipeline
//!
//! The dispatcher only talks to these traits. Production implementations
//! shell out to external tools or decode in-process; tests substitute fakes.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::metadata::RawRecord;

/// Produces a resized JPEG from a still image
#[async_trait]
pub trait Resizer: Send + Sync {
    /// Write a thumbnail of `source` scaled to `target_width` at `dest`.
    ///
    /// The returned path is where the file actually landed: its extension
    /// always matches the JPEG encoding, even if `dest` said otherwise.
    async fn resize(&self, source: &Path, target_width: u32, dest: &Path)
        -> anyhow::Result<PathBuf>;
}

/// Grabs one representative still frame from a video
#[async_trait]
pub trait CoverFrameExtractor: Send + Sync {
    async fn extract_cover_frame(&self, video: &Path, dest: &Path) -> anyhow::Result<()>;
}

/// Reads the raw, tool-native metadata record of a media file
#[async_trait]
pub trait MetadataProbe: Send + Sync {
    async fn probe(&self, path: &Path) -> anyhow::Result<RawRecord>;
}
