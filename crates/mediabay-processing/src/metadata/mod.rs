//! Metadata probing and normalization

pub mod document;
pub mod normalizer;
pub mod probe;
pub mod raw;

pub use document::{CameraInfo, FileInfo, ImageInfo, Location, MetadataDocument, VideoInfo};
pub use normalizer::{normalize, parse_timestamp};
pub use probe::{parse_exiftool_output, ExifToolProbe, NativeImageProbe};
pub use raw::{RawRecord, RawValue};
