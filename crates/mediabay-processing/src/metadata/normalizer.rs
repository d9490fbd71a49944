//! Raw record -> `MetadataDocument`
//!
//! Every document field has an ordered list of candidate tag names. The first
//! candidate that is present and coerces to the field's type wins; a field
//! with no usable candidate stays absent. Normalization never fails.

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};

use super::document::{CameraInfo, FileInfo, ImageInfo, Location, MetadataDocument, VideoInfo};
use super::raw::{lookup, RawRecord, RawValue};

/// Candidate tag names, in priority order.
pub mod keys {
    pub const DATE_TIME_ORIGINAL: &[&str] = &["DateTimeOriginal", "CreateDate", "ModifyDate"];

    pub const FILE_SIZE: &[&str] = &["FileSize"];
    pub const FILE_TYPE: &[&str] = &["FileType"];
    pub const MIME_TYPE: &[&str] = &["MIMEType"];

    pub const IMAGE_WIDTH: &[&str] = &["ImageWidth", "ExifImageWidth", "Width"];
    pub const IMAGE_HEIGHT: &[&str] = &["ImageHeight", "ExifImageHeight", "Height"];
    pub const ORIENTATION: &[&str] = &["Orientation"];
    pub const COLOR_SPACE: &[&str] = &["ColorSpace"];
    pub const ENCODING_PROCESS: &[&str] = &["EncodingProcess"];

    pub const DURATION: &[&str] = &["Duration", "MediaDuration"];
    pub const VIDEO_WIDTH: &[&str] = &["VideoWidth", "ImageWidth"];
    pub const VIDEO_HEIGHT: &[&str] = &["VideoHeight", "ImageHeight"];
    pub const FRAME_RATE: &[&str] = &["VideoFrameRate", "FrameRate"];
    pub const BITRATE: &[&str] = &["AvgBitrate", "Bitrate"];
    pub const ENCODER: &[&str] = &["Encoder"];
    pub const ROTATION: &[&str] = &["Rotation"];
    pub const AUDIO_FORMAT: &[&str] = &["AudioFormat"];
    pub const AUDIO_CHANNELS: &[&str] = &["AudioChannels", "Channels"];
    pub const AUDIO_SAMPLE_RATE: &[&str] = &["AudioSampleRate", "SampleRate"];
    pub const AUDIO_BITS_PER_SAMPLE: &[&str] = &["AudioBitsPerSample", "BitsPerSample"];

    pub const MAKE: &[&str] = &["Make"];
    pub const MODEL: &[&str] = &["Model"];
    pub const SOFTWARE: &[&str] = &["Software"];
    pub const EXPOSURE_TIME: &[&str] = &["ExposureTime"];
    pub const F_NUMBER: &[&str] = &["FNumber"];
    pub const ISO: &[&str] = &["ISO", "ISOSpeed"];
    pub const FOCAL_LENGTH: &[&str] = &["FocalLength"];
    pub const FOCAL_LENGTH_35MM: &[&str] = &["FocalLengthIn35mmFormat"];
    pub const FLASH: &[&str] = &["Flash"];
    pub const LIGHT_SOURCE: &[&str] = &["LightSource"];
    pub const EXPOSURE_MODE: &[&str] = &["ExposureMode"];
    pub const WHITE_BALANCE: &[&str] = &["WhiteBalance"];

    pub const GPS_LATITUDE: &[&str] = &["GPSLatitude"];
    pub const GPS_LONGITUDE: &[&str] = &["GPSLongitude"];
}

enum DateLayout {
    /// chrono format string; the value carries no zone and is read as UTC.
    Naive(&'static str),
    Rfc3339,
}

/// Tried in order; the first that parses wins.
const DATE_LAYOUTS: &[DateLayout] = &[
    DateLayout::Naive("%Y:%m:%d %H:%M:%S"),
    DateLayout::Naive("%Y-%m-%dT%H:%M:%SZ"),
    DateLayout::Naive("%Y-%m-%d %H:%M:%S"),
    DateLayout::Rfc3339,
];

/// Parse a capture timestamp in any of the accepted layouts.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DATE_LAYOUTS.iter().find_map(|layout| match layout {
        DateLayout::Naive(format) => NaiveDateTime::parse_from_str(text, format)
            .ok()
            .map(|naive| naive.and_utc()),
        DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
    })
}

/// Map a raw record onto the normalized document. `source` supplies the
/// base name; nothing is read from disk.
pub fn normalize(raw: &RawRecord, source: &Path) -> MetadataDocument {
    let file_info = FileInfo {
        base_name: source
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default(),
        file_size: text(raw, keys::FILE_SIZE),
        file_type: text(raw, keys::FILE_TYPE),
        mime_type: text(raw, keys::MIME_TYPE),
    };

    let is_video = file_info
        .mime_type
        .as_deref()
        .map(|mime| mime.to_ascii_lowercase().contains("video"))
        .unwrap_or(false);

    let (image, video) = if is_video {
        (None, Some(video_info(raw)))
    } else {
        (Some(image_info(raw)), None)
    };

    MetadataDocument {
        file_info,
        image,
        video,
        camera: camera_info(raw),
        location: Location {
            latitude: lookup(raw, keys::GPS_LATITUDE, RawValue::as_coordinate),
            longitude: lookup(raw, keys::GPS_LONGITUDE, RawValue::as_coordinate),
        },
        date_time_original: lookup(raw, keys::DATE_TIME_ORIGINAL, |value| {
            value.as_text().and_then(|t| parse_timestamp(&t))
        }),
    }
}

fn image_info(raw: &RawRecord) -> ImageInfo {
    let width = dimension(raw, keys::IMAGE_WIDTH);
    let height = dimension(raw, keys::IMAGE_HEIGHT);
    let megapixels = match (width, height) {
        (Some(w), Some(h)) => Some(w as f64 * h as f64 / 1_000_000.0),
        _ => None,
    };

    ImageInfo {
        width,
        height,
        megapixels,
        orientation: text(raw, keys::ORIENTATION),
        color_space: text(raw, keys::COLOR_SPACE),
        encoding_process: text(raw, keys::ENCODING_PROCESS),
    }
}

fn video_info(raw: &RawRecord) -> VideoInfo {
    VideoInfo {
        media_duration: text(raw, keys::DURATION),
        width: dimension(raw, keys::VIDEO_WIDTH),
        height: dimension(raw, keys::VIDEO_HEIGHT),
        video_frame_rate: lookup(raw, keys::FRAME_RATE, RawValue::as_float),
        avg_bitrate: text(raw, keys::BITRATE),
        encoder: text(raw, keys::ENCODER),
        rotation: lookup(raw, keys::ROTATION, RawValue::as_integer),
        audio_format: text(raw, keys::AUDIO_FORMAT),
        audio_channels: lookup(raw, keys::AUDIO_CHANNELS, RawValue::as_integer),
        audio_sample_rate: lookup(raw, keys::AUDIO_SAMPLE_RATE, RawValue::as_integer),
        audio_bits_per_sample: lookup(raw, keys::AUDIO_BITS_PER_SAMPLE, RawValue::as_integer),
    }
}

fn camera_info(raw: &RawRecord) -> CameraInfo {
    CameraInfo {
        make: text(raw, keys::MAKE),
        model: text(raw, keys::MODEL),
        software: text(raw, keys::SOFTWARE),
        exposure_time: text(raw, keys::EXPOSURE_TIME),
        f_number: lookup(raw, keys::F_NUMBER, RawValue::as_float),
        iso: lookup(raw, keys::ISO, RawValue::as_integer),
        focal_length: text(raw, keys::FOCAL_LENGTH),
        focal_length_35mm: text(raw, keys::FOCAL_LENGTH_35MM),
        flash: text(raw, keys::FLASH),
        light_source: text(raw, keys::LIGHT_SOURCE),
        exposure_mode: text(raw, keys::EXPOSURE_MODE),
        white_balance: text(raw, keys::WHITE_BALANCE),
    }
}

fn text(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    lookup(raw, keys, RawValue::as_text)
}

/// Pixel dimensions must be positive and fit in u32.
fn dimension(raw: &RawRecord, keys: &[&str]) -> Option<u32> {
    lookup(raw, keys, |value| {
        value
            .as_integer()
            .and_then(|i| u32::try_from(i).ok())
            .filter(|d| *d > 0)
    })
}
