//! Mediabay Storage Library
//!
//! Filesystem side of the ingest pipeline: per-workspace directories under a
//! single upload root, streamed persistence of originals, and removal of
//! artifacts left behind by aborted uploads.
//!
//! # On-disk layout
//!
//! ```text
//! {upload_root}/{workspace_id}/{asset_id}.jpg        image original, or video cover
//! {upload_root}/{workspace_id}/{asset_id}.mp4        video original
//! {upload_root}/{workspace_id}/{asset_id}_{W}.jpg    thumbnail of width W
//! ```
//!
//! File names are produced only by the `layout` module.

pub mod error;
pub mod layout;
pub mod workspace;

// Re-export commonly used types
pub use error::{StorageError, StorageResult};
pub use workspace::WorkspaceManager;
