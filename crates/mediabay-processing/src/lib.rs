//! Mediabay Media Processing Library
//!
//! This crate derives thumbnails, cover frames and normalized metadata from
//! uploaded media, and dispatches uploads through those stages.

pub mod batch;
pub mod image;
pub mod metadata;
pub mod pipeline;
pub mod tool;
pub mod traits;
pub mod video;

// Re-export commonly used types
pub use batch::{BatchReport, BatchThumbnailer};
pub use image::{jpeg_destination, ImageOrientation, ImageResize, ThumbnailEngine};
pub use metadata::{
    normalize, parse_timestamp, ExifToolProbe, MetadataDocument, NativeImageProbe, RawRecord,
    RawValue,
};
pub use pipeline::{AssetBundle, AssetResult, IngestPipeline, IngestStage, MediaKind, Thumbnail};
pub use traits::{CoverFrameExtractor, MetadataProbe, Resizer};
pub use video::FfmpegCoverExtractor;
