//! Video cover-frame extraction

pub mod cover;

pub use cover::FfmpegCoverExtractor;
