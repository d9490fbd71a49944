//! Configuration module
//!
//! `IngestConfig` is built once (usually from the environment) and handed to
//! the pipeline at construction time. Nothing in the pipeline reads process
//! globals, so several pipelines with different settings can coexist.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const UPLOAD_DIR: &str = "./uploads";
const IMAGE_THUMBNAIL_WIDTHS: &str = "270";
const VIDEO_THUMBNAIL_WIDTHS: &str = "270,400";
const COVER_FRAME_OFFSET_SECS: f64 = 5.0;
const COVER_FRAME_MAX_WIDTH: u32 = 1280;
const BATCH_WORKERS: usize = 4;

/// Which raw-metadata source feeds the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProbeKind {
    /// The `exiftool` binary; covers stills and video containers.
    Exiftool,
    /// In-process decoding of still images only.
    Native,
}

impl FromStr for MetadataProbeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "exiftool" => Ok(MetadataProbeKind::Exiftool),
            "native" => Ok(MetadataProbeKind::Native),
            _ => Err(anyhow::anyhow!("Invalid metadata probe: {}", s)),
        }
    }
}

impl Display for MetadataProbeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MetadataProbeKind::Exiftool => write!(f, "exiftool"),
            MetadataProbeKind::Native => write!(f, "native"),
        }
    }
}

/// Which displayed edge a thumbnail's target size applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleBasis {
    /// Output displayed width equals the target.
    Width,
    /// Output's longer displayed edge equals the target. This is the mode
    /// under which a rotated source's longer side always comes out at W.
    LongestEdge,
}

impl FromStr for ScaleBasis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "width" => Ok(ScaleBasis::Width),
            "longest-edge" | "longest_edge" => Ok(ScaleBasis::LongestEdge),
            _ => Err(anyhow::anyhow!("Invalid thumbnail scale basis: {}", s)),
        }
    }
}

impl Display for ScaleBasis {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ScaleBasis::Width => write!(f, "width"),
            ScaleBasis::LongestEdge => write!(f, "longest-edge"),
        }
    }
}

/// What happens to already-written files when an upload aborts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialFailurePolicy {
    /// Leave every artifact on disk.
    Retain,
    /// Remove the artifacts this upload wrote before reporting the error.
    Cleanup,
}

impl FromStr for PartialFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "retain" => Ok(PartialFailurePolicy::Retain),
            "cleanup" => Ok(PartialFailurePolicy::Cleanup),
            _ => Err(anyhow::anyhow!("Invalid partial failure policy: {}", s)),
        }
    }
}

impl Display for PartialFailurePolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PartialFailurePolicy::Retain => write!(f, "retain"),
            PartialFailurePolicy::Cleanup => write!(f, "cleanup"),
        }
    }
}

/// Ingest pipeline configuration
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub upload_root: PathBuf,
    /// Ascending, deduplicated.
    pub image_thumbnail_widths: Vec<u32>,
    /// Ascending, deduplicated.
    pub video_thumbnail_widths: Vec<u32>,
    pub cover_frame_offset_secs: f64,
    pub cover_frame_max_width: u32,
    pub ffmpeg_path: String,
    pub exiftool_path: String,
    pub metadata_probe: MetadataProbeKind,
    pub thumbnail_scale_basis: ScaleBasis,
    pub partial_failure_policy: PartialFailurePolicy,
    pub batch_workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from(UPLOAD_DIR),
            image_thumbnail_widths: parse_widths(IMAGE_THUMBNAIL_WIDTHS),
            video_thumbnail_widths: parse_widths(VIDEO_THUMBNAIL_WIDTHS),
            cover_frame_offset_secs: COVER_FRAME_OFFSET_SECS,
            cover_frame_max_width: COVER_FRAME_MAX_WIDTH,
            ffmpeg_path: "ffmpeg".to_string(),
            exiftool_path: "exiftool".to_string(),
            metadata_probe: MetadataProbeKind::Exiftool,
            thumbnail_scale_basis: ScaleBasis::Width,
            partial_failure_policy: PartialFailurePolicy::Retain,
            batch_workers: BATCH_WORKERS,
        }
    }
}

impl IngestConfig {
    /// Default settings rooted at `upload_root`.
    pub fn with_upload_root(upload_root: impl Into<PathBuf>) -> Self {
        Self {
            upload_root: upload_root.into(),
            ..Self::default()
        }
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upload_root = lookup("UPLOAD_DIR").unwrap_or_else(|| UPLOAD_DIR.to_string());

        let image_thumbnail_widths = parse_widths(
            &lookup("IMAGE_THUMBNAIL_WIDTHS").unwrap_or_else(|| IMAGE_THUMBNAIL_WIDTHS.to_string()),
        );
        let video_thumbnail_widths = parse_widths(
            &lookup("VIDEO_THUMBNAIL_WIDTHS").unwrap_or_else(|| VIDEO_THUMBNAIL_WIDTHS.to_string()),
        );

        let config = Self {
            upload_root: PathBuf::from(upload_root),
            image_thumbnail_widths,
            video_thumbnail_widths,
            cover_frame_offset_secs: lookup("COVER_FRAME_OFFSET_SECS")
                .unwrap_or_else(|| COVER_FRAME_OFFSET_SECS.to_string())
                .parse()
                .unwrap_or(COVER_FRAME_OFFSET_SECS),
            cover_frame_max_width: lookup("COVER_FRAME_MAX_WIDTH")
                .unwrap_or_else(|| COVER_FRAME_MAX_WIDTH.to_string())
                .parse()
                .unwrap_or(COVER_FRAME_MAX_WIDTH),
            ffmpeg_path: lookup("FFMPEG_PATH").unwrap_or_else(|| "ffmpeg".to_string()),
            exiftool_path: lookup("EXIFTOOL_PATH").unwrap_or_else(|| "exiftool".to_string()),
            metadata_probe: lookup("METADATA_PROBE")
                .unwrap_or_else(|| "exiftool".to_string())
                .parse()?,
            thumbnail_scale_basis: lookup("THUMBNAIL_SCALE_BASIS")
                .unwrap_or_else(|| "width".to_string())
                .parse()?,
            partial_failure_policy: lookup("PARTIAL_FAILURE_POLICY")
                .unwrap_or_else(|| "retain".to_string())
                .parse()?,
            batch_workers: lookup("BATCH_WORKERS")
                .unwrap_or_else(|| BATCH_WORKERS.to_string())
                .parse()
                .unwrap_or(BATCH_WORKERS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        validate_widths("IMAGE_THUMBNAIL_WIDTHS", &self.image_thumbnail_widths)?;
        validate_widths("VIDEO_THUMBNAIL_WIDTHS", &self.video_thumbnail_widths)?;

        if !self.cover_frame_offset_secs.is_finite() || self.cover_frame_offset_secs < 0.0 {
            return Err(anyhow::anyhow!(
                "COVER_FRAME_OFFSET_SECS must be a non-negative number"
            ));
        }

        if self.cover_frame_max_width == 0 {
            return Err(anyhow::anyhow!("COVER_FRAME_MAX_WIDTH must be greater than 0"));
        }

        if self.batch_workers == 0 {
            return Err(anyhow::anyhow!("BATCH_WORKERS must be greater than 0"));
        }

        if self.upload_root.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("UPLOAD_DIR must not be empty"));
        }

        Ok(())
    }

    /// Thumbnail widths for the given media kind, in generation order.
    pub fn thumbnail_widths(&self, is_video: bool) -> &[u32] {
        if is_video {
            &self.video_thumbnail_widths
        } else {
            &self.image_thumbnail_widths
        }
    }
}

/// Parse a comma-separated width list. Unparseable entries are dropped;
/// the result is sorted ascending and deduplicated.
fn parse_widths(raw: &str) -> Vec<u32> {
    let mut widths: Vec<u32> = raw
        .split(',')
        .filter_map(|s| s.trim().parse().ok())
        .collect();
    widths.sort_unstable();
    widths.dedup();
    widths
}

fn validate_widths(name: &str, widths: &[u32]) -> Result<(), anyhow::Error> {
    if widths.is_empty() {
        return Err(anyhow::anyhow!("{} must list at least one width", name));
    }
    if widths.contains(&0) {
        return Err(anyhow::anyhow!("{} must not contain 0", name));
    }
    if widths.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(anyhow::anyhow!("{} must be strictly ascending", name));
    }
    Ok(())
}
