//! mediabay: ingest media into workspaces and derive thumbnails from the command line.
//!
//! Settings come from the environment (or a `.env` file); see `IngestConfig`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use mediabay_cli::{format_failure, init_tracing, open_upload, print_json};
use mediabay_core::{AppError, IngestConfig, MetadataProbeKind};
use mediabay_processing::{
    normalize, BatchThumbnailer, ExifToolProbe, IngestPipeline, MediaKind, MetadataProbe,
    NativeImageProbe, ThumbnailEngine,
};

#[derive(Parser)]
#[command(name = "mediabay", about = "Media ingest and thumbnail pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new, empty workspace and print its id
    CreateWorkspace,
    /// Ingest one file into a workspace
    Ingest {
        /// Target workspace id
        #[arg(long, value_name = "UUID")]
        workspace: Uuid,
        /// Treat the file as a video (cover frame + video thumbnail widths)
        #[arg(long)]
        video: bool,
        /// File to ingest
        file: PathBuf,
    },
    /// Generate thumbnails for every image in a directory
    Thumbnails {
        /// Directory holding the source images
        dir: PathBuf,
        /// Output directory (default: <DIR>/thumbnails)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Thumbnail width in pixels (default: first image thumbnail width)
        #[arg(long)]
        width: Option<u32>,
        /// Number of parallel workers (default: BATCH_WORKERS)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the normalized metadata of a file
    Probe {
        /// File to probe
        file: PathBuf,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceCreated {
    workspace_id: Uuid,
    path: PathBuf,
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{}", format_failure(&err));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = IngestConfig::from_env()
        .map_err(|e| AppError::InvalidInput(format!("Invalid configuration: {:#}", e)))?;

    match cli.command {
        Commands::CreateWorkspace => {
            let pipeline = IngestPipeline::from_config(config)?;
            let workspace_id = pipeline.create_workspace().await?;
            print_json(&WorkspaceCreated {
                workspace_id,
                path: pipeline.workspaces().workspace_path(workspace_id),
            })?;
        }
        Commands::Ingest {
            workspace,
            video,
            file,
        } => {
            let pipeline = IngestPipeline::from_config(config)?;
            let upload = open_upload(&file).await?;
            let result = pipeline
                .ingest_media(workspace, MediaKind::from_is_video(video), upload)
                .await?;
            print_json(&result)?;
        }
        Commands::Thumbnails {
            dir,
            output,
            width,
            workers,
        } => {
            let width = match width {
                Some(width) => width,
                None => config
                    .image_thumbnail_widths
                    .first()
                    .copied()
                    .ok_or_else(|| {
                        AppError::InvalidInput("No image thumbnail width configured".to_string())
                    })?,
            };
            if width == 0 {
                return Err(AppError::InvalidInput(
                    "Thumbnail width must be greater than 0".to_string(),
                ));
            }

            let output = output.unwrap_or_else(|| BatchThumbnailer::default_output_dir(&dir));
            let resizer = Arc::new(ThumbnailEngine::new(config.thumbnail_scale_basis));
            let batch = BatchThumbnailer::new(
                resizer,
                width,
                workers.unwrap_or(config.batch_workers),
            );
            let report = batch.run(&dir, &output).await?;
            print_json(&report)?;
        }
        Commands::Probe { file } => {
            if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
                return Err(AppError::NotFound(format!("file {}", file.display())));
            }

            let probe: Arc<dyn MetadataProbe> = match config.metadata_probe {
                MetadataProbeKind::Exiftool => Arc::new(
                    ExifToolProbe::new(config.exiftool_path.clone())
                        .map_err(|e| AppError::InvalidInput(format!("{:#}", e)))?,
                ),
                MetadataProbeKind::Native => Arc::new(NativeImageProbe),
            };
            let raw = probe
                .probe(&file)
                .await
                .map_err(|e| AppError::processing("Metadata probe failed", e))?;
            print_json(&normalize(&raw, &file))?;
        }
    }

    Ok(())
}
