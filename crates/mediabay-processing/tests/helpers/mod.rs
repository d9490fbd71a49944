//! Shared fixtures for the processing integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};

use mediabay_core::IngestConfig;
use mediabay_processing::{
    CoverFrameExtractor, MetadataProbe, RawRecord, RawValue, Resizer, ThumbnailEngine,
};

pub fn test_config(root: &Path) -> IngestConfig {
    IngestConfig::with_upload_root(root)
}

/// Plain JPEG of the given size.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]))
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
        .unwrap();
    buffer
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buffer = Vec::new();
    RgbImage::from_pixel(width, height, Rgb([10, 200, 30]))
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

/// JPEG whose stored pixels are `width` x `height`, carrying an EXIF block
/// with the given orientation tag.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let plain = jpeg_bytes(width, height);
    assert_eq!(&plain[..2], &[0xFF, 0xD8]);

    let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
    app1.extend_from_slice(b"Exif\0\0");
    // Big-endian TIFF header, IFD0 at offset 8.
    app1.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
    // One entry: Orientation (0x0112), SHORT, count 1.
    app1.extend_from_slice(&[0x00, 0x01]);
    app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
    app1.extend_from_slice(&orientation.to_be_bytes());
    app1.extend_from_slice(&[0x00, 0x00]);
    // No next IFD.
    app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);
    assert_eq!(app1.len(), 2 + 0x22);

    let mut out = Vec::with_capacity(plain.len() + app1.len());
    out.extend_from_slice(&plain[..2]);
    out.extend_from_slice(&app1);
    out.extend_from_slice(&plain[2..]);
    out
}

/// Names of the regular files directly inside `dir`.
pub fn file_names(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap())
        .filter(|entry| entry.file_type().unwrap().is_file())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect()
}

/// Writes a generated JPEG instead of running ffmpeg.
#[derive(Default)]
pub struct FakeCoverExtractor {
    pub calls: Mutex<Vec<(PathBuf, PathBuf)>>,
}

#[async_trait]
impl CoverFrameExtractor for FakeCoverExtractor {
    async fn extract_cover_frame(&self, video: &Path, dest: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push((video.to_path_buf(), dest.to_path_buf()));
        std::fs::write(dest, jpeg_bytes(1280, 720))?;
        Ok(())
    }
}

pub struct FailingExtractor;

#[async_trait]
impl CoverFrameExtractor for FailingExtractor {
    async fn extract_cover_frame(&self, _video: &Path, _dest: &Path) -> Result<()> {
        Err(anyhow!("FFmpeg cover frame extraction failed: moov atom not found"))
    }
}

/// Real thumbnail engine that records each call.
#[derive(Default)]
pub struct RecordingResizer {
    pub inner: ThumbnailEngine,
    pub calls: Mutex<Vec<(PathBuf, u32)>>,
}

impl RecordingResizer {
    pub fn calls(&self) -> Vec<(PathBuf, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Resizer for RecordingResizer {
    async fn resize(&self, source: &Path, target_width: u32, dest: &Path) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push((source.to_path_buf(), target_width));
        self.inner.resize(source, target_width, dest).await
    }
}

/// Fails for one width, resizes normally otherwise.
pub struct FailingResizer {
    pub fail_width: u32,
    pub inner: RecordingResizer,
}

impl FailingResizer {
    pub fn new(fail_width: u32) -> Self {
        Self {
            fail_width,
            inner: RecordingResizer::default(),
        }
    }
}

#[async_trait]
impl Resizer for FailingResizer {
    async fn resize(&self, source: &Path, target_width: u32, dest: &Path) -> Result<PathBuf> {
        if target_width == self.fail_width {
            self.inner
                .calls
                .lock()
                .unwrap()
                .push((source.to_path_buf(), target_width));
            return Err(anyhow!("Failed to decode image"));
        }
        self.inner.resize(source, target_width, dest).await
    }
}

/// Returns a canned record and remembers which paths were probed.
#[derive(Default)]
pub struct StaticProbe {
    pub record: RawRecord,
    pub calls: Mutex<Vec<PathBuf>>,
}

impl StaticProbe {
    pub fn new(pairs: Vec<(&str, RawValue)>) -> Self {
        Self {
            record: pairs
                .into_iter()
                .map(|(key, value)| (key.to_string(), value))
                .collect(),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MetadataProbe for StaticProbe {
    async fn probe(&self, path: &Path) -> Result<RawRecord> {
        self.calls.lock().unwrap().push(path.to_path_buf());
        Ok(self.record.clone())
    }
}

pub struct FailingProbe;

#[async_trait]
impl MetadataProbe for FailingProbe {
    async fn probe(&self, _path: &Path) -> Result<RawRecord> {
        Err(anyhow!("exiftool failed: Unknown file type"))
    }
}
