//! Mediabay Core Library
//!
//! Error taxonomy, configuration and identifier generation shared by every
//! Mediabay crate.

pub mod config;
pub mod error;
pub mod id;

// Re-export commonly used types
pub use config::{IngestConfig, MetadataProbeKind, PartialFailurePolicy, ScaleBasis};
pub use error::{AppError, ErrorKind, ErrorMetadata, LogLevel};
pub use id::{new_id, IdGenerator};
