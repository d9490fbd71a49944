use std::path::Path;
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use crate::tool::{canonicalize_media_path, validate_executable};
use crate::traits::CoverFrameExtractor;

/// Extracts the cover frame of a video with ffmpeg
///
/// One frame is taken at a fixed offset into the stream, optionally
/// downscaled so it is no wider than `max_width`, and written as a
/// high-quality JPEG.
#[derive(Debug, Clone)]
pub struct FfmpegCoverExtractor {
    ffmpeg_path: String,
    offset_secs: f64,
    max_width: u32,
}

impl FfmpegCoverExtractor {
    pub fn new(ffmpeg_path: String, offset_secs: f64, max_width: u32) -> Result<Self> {
        validate_executable("ffmpeg", &ffmpeg_path)?;

        if !offset_secs.is_finite() || offset_secs < 0.0 {
            return Err(anyhow!("Cover frame offset must be a non-negative number"));
        }

        Ok(Self {
            ffmpeg_path,
            offset_secs,
            max_width,
        })
    }

    fn build_args(&self, video: &str, dest: &str) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-ss".to_string(),
            self.offset_secs.to_string(),
            "-i".to_string(),
            video.to_string(),
            "-vframes".to_string(),
            "1".to_string(),
            "-q:v".to_string(),
            "2".to_string(),
            "-vf".to_string(),
            format!("scale='min({},iw)':-2", self.max_width),
            dest.to_string(),
        ]
    }
}

#[async_trait]
impl CoverFrameExtractor for FfmpegCoverExtractor {
    #[tracing::instrument(skip(self), fields(
        process.executable.name = "ffmpeg",
        process.executable.path = %self.ffmpeg_path,
        ffmpeg.operation = "cover_frame"
    ))]
    async fn extract_cover_frame(&self, video: &Path, dest: &Path) -> Result<()> {
        let start = std::time::Instant::now();

        let video_arg = canonicalize_media_path(video)
            .await
            .context("Invalid video path")?;
        let dest_arg = canonicalize_media_path(dest)
            .await
            .context("Invalid cover path")?;
        let args = self.build_args(&video_arg.to_string_lossy(), &dest_arg.to_string_lossy());

        let output = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context("Failed to execute ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("FFmpeg cover frame extraction failed: {}", stderr));
        }

        // ffmpeg exits 0 without writing anything when it finds no frame.
        if !tokio::fs::try_exists(dest).await.unwrap_or(false) {
            return Err(anyhow!(
                "FFmpeg produced no cover frame for {}",
                video.display()
            ));
        }

        tracing::info!(
            video = %video.display(),
            path = %dest.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Cover frame extracted"
        );

        Ok(())
    }
}
