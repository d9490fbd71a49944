//! Metadata probes: produce a `RawRecord` keyed by exiftool tag names

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use exif::{Exif, In, Tag, Value};
use image::{ImageFormat, ImageReader};
use tokio::process::Command;

use super::raw::{record_from_json, RawRecord, RawValue};
use crate::tool::{canonicalize_media_path, validate_executable};
use crate::traits::MetadataProbe;

/// Runs `exiftool -j -c %.6f <file>` and takes the first record
#[derive(Debug, Clone)]
pub struct ExifToolProbe {
    exiftool_path: String,
}

impl ExifToolProbe {
    pub fn new(exiftool_path: String) -> Result<Self> {
        validate_executable("exiftool", &exiftool_path)?;
        Ok(Self { exiftool_path })
    }
}

#[async_trait]
impl MetadataProbe for ExifToolProbe {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "exiftool",
        process.executable.path = %self.exiftool_path
    ))]
    async fn probe(&self, path: &Path) -> Result<RawRecord> {
        let start = std::time::Instant::now();
        let path_arg = canonicalize_media_path(path)
            .await
            .context("Invalid media path")?;

        let output = Command::new(&self.exiftool_path)
            .args(["-j", "-c", "%.6f"])
            .arg(&path_arg)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute exiftool")?;

        // exiftool exits non-zero for minor warnings while still printing JSON.
        if !output.status.success() && output.stdout.is_empty() {
            return Err(anyhow!(
                "exiftool failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        let record = parse_exiftool_output(&output.stdout)?;

        tracing::debug!(
            path = %path.display(),
            tag_count = record.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "exiftool probe completed"
        );

        Ok(record)
    }
}

/// Parse exiftool's `-j` output: a JSON array with one object per file.
pub fn parse_exiftool_output(stdout: &[u8]) -> Result<RawRecord> {
    let records: Vec<serde_json::Map<String, serde_json::Value>> =
        serde_json::from_slice(stdout).context("Failed to parse exiftool output")?;

    records
        .first()
        .map(record_from_json)
        .ok_or_else(|| anyhow!("exiftool returned no metadata"))
}

/// Reads still images in-process
///
/// Dimensions, format and MIME type come from the image decoder, tags from
/// the embedded EXIF block. Values are spelled the way exiftool prints them
/// where that is cheap, so the normalizer treats both probes alike.
/// Videos are rejected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeImageProbe;

#[async_trait]
impl MetadataProbe for NativeImageProbe {
    async fn probe(&self, path: &Path) -> Result<RawRecord> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || probe_image_file(&path))
            .await
            .context("Metadata task panicked")?
    }
}

/// EXIF ASCII tags copied verbatim, with their exiftool names.
const ASCII_TAGS: &[(Tag, &str)] = &[
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::Software, "Software"),
    (Tag::DateTimeOriginal, "DateTimeOriginal"),
    (Tag::DateTimeDigitized, "CreateDate"),
    (Tag::DateTime, "ModifyDate"),
];

/// Enumerated EXIF tags rendered through the EXIF library's descriptions.
const DESCRIBED_TAGS: &[(Tag, &str)] = &[
    (Tag::Flash, "Flash"),
    (Tag::LightSource, "LightSource"),
    (Tag::ExposureMode, "ExposureMode"),
    (Tag::WhiteBalance, "WhiteBalance"),
    (Tag::ColorSpace, "ColorSpace"),
];

/// EXIF integer tags.
const INTEGER_TAGS: &[(Tag, &str)] = &[
    (Tag::PixelXDimension, "ExifImageWidth"),
    (Tag::PixelYDimension, "ExifImageHeight"),
    (Tag::PhotographicSensitivity, "ISO"),
];

const ORIENTATION_NAMES: [&str; 8] = [
    "Horizontal (normal)",
    "Mirror horizontal",
    "Rotate 180",
    "Mirror vertical",
    "Mirror horizontal and rotate 270 CW",
    "Rotate 90 CW",
    "Mirror horizontal and rotate 90 CW",
    "Rotate 270 CW",
];

pub fn probe_image_file(path: &Path) -> Result<RawRecord> {
    let file_size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();

    let reader = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()
        .context("Failed to detect image format")?;
    let format = reader
        .format()
        .ok_or_else(|| anyhow!("Unrecognized image format: {}", path.display()))?;
    let (width, height) = reader
        .into_dimensions()
        .context("Failed to read image dimensions")?;

    let mut record = RawRecord::new();
    record.insert("FileSize".to_string(), RawValue::Text(format_file_size(file_size)));
    record.insert("FileType".to_string(), RawValue::Text(file_type_name(format)));
    record.insert(
        "MIMEType".to_string(),
        RawValue::Text(format.to_mime_type().to_string()),
    );
    record.insert("ImageWidth".to_string(), RawValue::Integer(width.into()));
    record.insert("ImageHeight".to_string(), RawValue::Integer(height.into()));

    match read_exif(path) {
        Ok(exif) => insert_exif_tags(&exif, &mut record),
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "No EXIF data"),
    }

    Ok(record)
}

fn read_exif(path: &Path) -> Result<Exif> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    exif::Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| anyhow!("Failed to read EXIF: {}", e))
}

fn insert_exif_tags(exif: &Exif, record: &mut RawRecord) {
    let field = |tag: Tag| exif.get_field(tag, In::PRIMARY);
    let mut insert = |name: &str, value: RawValue| {
        record.insert(name.to_string(), value);
    };

    for &(tag, name) in ASCII_TAGS {
        if let Some(text) = field(tag).and_then(|f| ascii(&f.value)) {
            insert(name, RawValue::Text(text));
        }
    }

    for &(tag, name) in DESCRIBED_TAGS {
        if let Some(f) = field(tag) {
            let text = f.display_value().to_string().replace('"', "");
            if !text.trim().is_empty() {
                insert(name, RawValue::Text(text.trim().to_string()));
            }
        }
    }

    for &(tag, name) in INTEGER_TAGS {
        if let Some(value) = field(tag).and_then(|f| f.value.get_uint(0)) {
            insert(name, RawValue::Integer(value.into()));
        }
    }

    if let Some(orientation) = field(Tag::Orientation).and_then(|f| f.value.get_uint(0)) {
        if let Some(name) = (orientation as usize)
            .checked_sub(1)
            .and_then(|i| ORIENTATION_NAMES.get(i))
        {
            insert("Orientation", RawValue::Text(name.to_string()));
        }
    }

    if let Some(f_number) = field(Tag::FNumber).and_then(|f| rational(&f.value, 0)) {
        insert("FNumber", RawValue::Float(round_to(f_number, 1)));
    }

    if let Some(exposure) = field(Tag::ExposureTime).and_then(|f| rational(&f.value, 0)) {
        insert("ExposureTime", RawValue::Text(format_exposure_time(exposure)));
    }

    if let Some(focal) = field(Tag::FocalLength).and_then(|f| rational(&f.value, 0)) {
        insert("FocalLength", RawValue::Text(format!("{:.1} mm", focal)));
    }

    if let Some(focal) = field(Tag::FocalLengthIn35mmFilm).and_then(|f| f.value.get_uint(0)) {
        insert("FocalLengthIn35mmFormat", RawValue::Text(format!("{} mm", focal)));
    }

    let latitude = gps_coordinate(
        field(Tag::GPSLatitude).map(|f| &f.value),
        field(Tag::GPSLatitudeRef).and_then(|f| ascii(&f.value)),
    );
    if let Some(latitude) = latitude {
        insert("GPSLatitude", RawValue::Float(latitude));
    }

    let longitude = gps_coordinate(
        field(Tag::GPSLongitude).map(|f| &f.value),
        field(Tag::GPSLongitudeRef).and_then(|f| ascii(&f.value)),
    );
    if let Some(longitude) = longitude {
        insert("GPSLongitude", RawValue::Float(longitude));
    }
}

fn ascii(value: &Value) -> Option<String> {
    match value {
        Value::Ascii(parts) => parts
            .first()
            .map(|bytes| String::from_utf8_lossy(bytes).trim_end_matches('\0').trim().to_string())
            .filter(|s| !s.is_empty()),
        _ => None,
    }
}

fn rational(value: &Value, index: usize) -> Option<f64> {
    match value {
        Value::Rational(parts) => parts
            .get(index)
            .filter(|r| r.denom != 0)
            .map(|r| r.to_f64()),
        _ => None,
    }
}

/// Degrees/minutes/seconds plus hemisphere reference -> signed degrees.
fn gps_coordinate(dms: Option<&Value>, reference: Option<String>) -> Option<f64> {
    let dms = dms?;
    let degrees = rational(dms, 0)?;
    let minutes = rational(dms, 1).unwrap_or(0.0);
    let seconds = rational(dms, 2).unwrap_or(0.0);
    let value = degrees + minutes / 60.0 + seconds / 3600.0;

    let negative = matches!(reference.as_deref(), Some("S") | Some("W"));
    Some(round_to(if negative { -value } else { value }, 6))
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// exiftool prints short exposures as a fraction.
fn format_exposure_time(seconds: f64) -> String {
    if seconds > 0.0 && seconds < 0.25001 {
        format!("1/{}", (1.0 / seconds).round() as u64)
    } else {
        let rounded = round_to(seconds, 1);
        if rounded.fract() == 0.0 {
            format!("{}", rounded as u64)
        } else {
            format!("{}", rounded)
        }
    }
}

/// Human-readable size in exiftool's style (1024-based units).
fn format_file_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let b = bytes as f64;
    if bytes < 2048 {
        format!("{} bytes", bytes)
    } else if b < 10.0 * KB {
        format!("{:.1} kB", b / KB)
    } else if b < 2.0 * MB {
        format!("{:.0} kB", b / KB)
    } else if b < 10.0 * MB {
        format!("{:.1} MB", b / MB)
    } else if b < 2.0 * GB {
        format!("{:.0} MB", b / MB)
    } else if b < 10.0 * GB {
        format!("{:.1} GB", b / GB)
    } else {
        format!("{:.0} GB", b / GB)
    }
}

fn file_type_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::Tiff => "TIFF".to_string(),
        other => format!("{:?}", other).to_uppercase(),
    }
}
