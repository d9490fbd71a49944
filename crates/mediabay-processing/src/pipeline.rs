//! Ingest pipeline: save → (cover) → thumbnails → metadata.
//!
//! One upload is one linear pass on the calling task. Every stage after the
//! original is written depends on the file produced by the stage before it,
//! so nothing inside a single upload runs in parallel. Concurrent uploads
//! never share file names because each gets a fresh asset id.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncRead;
use uuid::Uuid;

use mediabay_core::{new_id, AppError, IngestConfig, MetadataProbeKind, PartialFailurePolicy};
use mediabay_storage::{layout, WorkspaceManager};

use crate::image::ThumbnailEngine;
use crate::metadata::{normalize, ExifToolProbe, MetadataDocument, NativeImageProbe};
use crate::traits::{CoverFrameExtractor, MetadataProbe, Resizer};
use crate::video::FfmpegCoverExtractor;

/// What kind of media an upload carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_is_video(is_video: bool) -> Self {
        if is_video {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaKind::Video)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Position of an upload in the ingest state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Saved,
    CoverExtracted,
    Thumbnailed,
    MetadataProbed,
    Completed,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::Received => "received",
            IngestStage::Saved => "saved",
            IngestStage::CoverExtracted => "cover_extracted",
            IngestStage::Thumbnailed => "thumbnailed",
            IngestStage::MetadataProbed => "metadata_probed",
            IngestStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thumbnail {
    pub width: u32,
    pub path: PathBuf,
}

/// Files written for one asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetBundle {
    pub original: PathBuf,
    /// Video only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover: Option<PathBuf>,
    /// Ascending by width.
    pub thumbnails: Vec<Thumbnail>,
}

/// Outcome of a successful ingest
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResult {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub kind: MediaKind,
    pub bundle: AssetBundle,
    /// Default-valued when probing failed.
    pub metadata: MetadataDocument,
}

/// Dispatches uploads through the derivation stages
///
/// Collaborators are injected so several pipelines with different settings
/// and fakes can coexist.
#[derive(Clone)]
pub struct IngestPipeline {
    config: IngestConfig,
    workspaces: WorkspaceManager,
    resizer: Arc<dyn Resizer>,
    cover_extractor: Arc<dyn CoverFrameExtractor>,
    probe: Arc<dyn MetadataProbe>,
}

/// Failure inside one ingest, before cleanup is applied
struct StageFailure {
    stage: IngestStage,
    error: AppError,
}

impl StageFailure {
    fn new(stage: IngestStage, error: impl Into<AppError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

impl IngestPipeline {
    pub fn new(
        config: IngestConfig,
        resizer: Arc<dyn Resizer>,
        cover_extractor: Arc<dyn CoverFrameExtractor>,
        probe: Arc<dyn MetadataProbe>,
    ) -> Self {
        let workspaces = WorkspaceManager::new(config.upload_root.clone());
        Self {
            config,
            workspaces,
            resizer,
            cover_extractor,
            probe,
        }
    }

    /// Build a pipeline with the production collaborators named by `config`.
    pub fn from_config(config: IngestConfig) -> Result<Self, AppError> {
        config
            .validate()
            .map_err(|e| AppError::InvalidInput(format!("Invalid configuration: {:#}", e)))?;

        let resizer = Arc::new(ThumbnailEngine::new(config.thumbnail_scale_basis));
        let cover_extractor = Arc::new(
            FfmpegCoverExtractor::new(
                config.ffmpeg_path.clone(),
                config.cover_frame_offset_secs,
                config.cover_frame_max_width,
            )
            .map_err(|e| AppError::InvalidInput(format!("Invalid ffmpeg settings: {:#}", e)))?,
        );
        let probe: Arc<dyn MetadataProbe> = match config.metadata_probe {
            MetadataProbeKind::Exiftool => Arc::new(
                ExifToolProbe::new(config.exiftool_path.clone()).map_err(|e| {
                    AppError::InvalidInput(format!("Invalid exiftool settings: {:#}", e))
                })?,
            ),
            MetadataProbeKind::Native => Arc::new(NativeImageProbe),
        };

        Ok(Self::new(config, resizer, cover_extractor, probe))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Allocate a fresh workspace id and create its directory.
    pub async fn create_workspace(&self) -> Result<Uuid, AppError> {
        let workspace_id = new_id()?;
        self.workspaces.ensure_workspace(workspace_id).await?;

        tracing::info!(workspace_id = %workspace_id, "Workspace created");
        Ok(workspace_id)
    }

    pub async fn ensure_workspace(&self, workspace_id: Uuid) -> Result<PathBuf, AppError> {
        Ok(self.workspaces.ensure_workspace(workspace_id).await?)
    }

    /// Persist one upload and derive its cover, thumbnails and metadata.
    ///
    /// The first failing stage aborts the upload. Metadata probing is the
    /// exception: its failure is logged and a default document is returned.
    /// Under [`PartialFailurePolicy::Cleanup`] every file this call wrote is
    /// removed before the error is returned; otherwise they stay on disk.
    #[tracing::instrument(skip_all, fields(workspace_id = %workspace_id, kind = %kind))]
    pub async fn ingest_media<R>(
        &self,
        workspace_id: Uuid,
        kind: MediaKind,
        reader: R,
    ) -> Result<AssetResult, AppError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = std::time::Instant::now();
        let mut artifacts = Vec::new();

        match self
            .run_stages(workspace_id, kind, reader, &mut artifacts)
            .await
        {
            Ok(result) => {
                tracing::info!(
                    asset_id = %result.id,
                    thumbnails = result.bundle.thumbnails.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Ingest completed"
                );
                Ok(result)
            }
            Err(StageFailure { stage, error }) => {
                tracing::warn!(
                    stage = %stage,
                    error_code = error.error_type(),
                    error = %error.detailed_message(),
                    artifacts = artifacts.len(),
                    "Ingest aborted"
                );

                if self.config.partial_failure_policy == PartialFailurePolicy::Cleanup {
                    let removed = self.workspaces.remove_artifacts(&artifacts).await;
                    tracing::info!(removed, "Partial upload cleaned up");
                }

                Err(error)
            }
        }
    }

    /// Every path a stage is about to write is pushed to `artifacts` before
    /// the write starts, so cleanup also covers half-written files.
    async fn run_stages<R>(
        &self,
        workspace_id: Uuid,
        kind: MediaKind,
        reader: R,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<AssetResult, StageFailure>
    where
        R: AsyncRead + Unpin + Send,
    {
        let dir = self
            .workspaces
            .ensure_workspace(workspace_id)
            .await
            .map_err(|e| StageFailure::new(IngestStage::Received, e))?;
        let asset_id = new_id().map_err(|e| StageFailure::new(IngestStage::Received, e))?;

        let original_name = layout::original_file_name(asset_id, kind.is_video());
        artifacts.push(dir.join(&original_name));
        let (original, size_bytes) = self
            .workspaces
            .write_original(&dir, &original_name, reader)
            .await
            .map_err(|e| StageFailure::new(IngestStage::Received, e))?;
        self.transition(asset_id, IngestStage::Saved);
        tracing::debug!(asset_id = %asset_id, size_bytes, "Original saved");

        let cover = if kind.is_video() {
            let cover = dir.join(layout::cover_file_name(asset_id));
            artifacts.push(cover.clone());
            self.cover_extractor
                .extract_cover_frame(&original, &cover)
                .await
                .map_err(|e| {
                    StageFailure::new(
                        IngestStage::Saved,
                        AppError::processing("Cover frame extraction failed", e),
                    )
                })?;
            self.transition(asset_id, IngestStage::CoverExtracted);
            Some(cover)
        } else {
            None
        };

        let thumbnail_source = cover.as_deref().unwrap_or(original.as_path());
        let reached = if kind.is_video() {
            IngestStage::CoverExtracted
        } else {
            IngestStage::Saved
        };
        let thumbnails = self
            .generate_thumbnails(&dir, asset_id, kind, thumbnail_source, artifacts)
            .await
            .map_err(|e| StageFailure::new(reached, e))?;
        self.transition(asset_id, IngestStage::Thumbnailed);

        let metadata = self.probe_metadata(asset_id, &original).await;
        self.transition(asset_id, IngestStage::MetadataProbed);

        self.transition(asset_id, IngestStage::Completed);
        Ok(AssetResult {
            id: asset_id,
            workspace_id,
            kind,
            bundle: AssetBundle {
                original,
                cover,
                thumbnails,
            },
            metadata,
        })
    }

    /// One resize per configured width, ascending. The first failure stops
    /// the rest; smaller thumbnails already written are left to the caller's
    /// cleanup policy.
    async fn generate_thumbnails(
        &self,
        dir: &Path,
        asset_id: Uuid,
        kind: MediaKind,
        source: &Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<Vec<Thumbnail>, AppError> {
        let widths = self.config.thumbnail_widths(kind.is_video());
        let mut thumbnails = Vec::with_capacity(widths.len());

        for &width in widths {
            let dest = ThumbnailEngine::thumbnail_path(dir, asset_id, width);
            artifacts.push(dest.clone());

            let path = self
                .resizer
                .resize(source, width, &dest)
                .await
                .map_err(|e| {
                    AppError::processing(format!("Thumbnail generation failed for width {}", width), e)
                })?;
            if path != dest {
                artifacts.push(path.clone());
            }

            tracing::debug!(asset_id = %asset_id, width, path = %path.display(), "Thumbnail written");
            thumbnails.push(Thumbnail { width, path });
        }

        Ok(thumbnails)
    }

    /// Probe the original. Never fails: a probe error yields a default
    /// document.
    async fn probe_metadata(&self, asset_id: Uuid, original: &Path) -> MetadataDocument {
        match self.probe.probe(original).await {
            Ok(raw) => normalize(&raw, original),
            Err(e) => {
                tracing::warn!(
                    asset_id = %asset_id,
                    path = %original.display(),
                    error = %format!("{:#}", e),
                    "Metadata probe failed, continuing with empty metadata"
                );
                MetadataDocument::default()
            }
        }
    }

    fn transition(&self, asset_id: Uuid, stage: IngestStage) {
        tracing::debug!(asset_id = %asset_id, stage = %stage, "Ingest stage reached");
    }
}
