//! Helpers shared by the `mediabay` binary

use std::path::Path;

use anyhow::Context;
use serde::Serialize;

use mediabay_core::{AppError, ErrorMetadata};

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so stdout carries only JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Open an upload for streaming. A missing file is `NotFound`.
pub async fn open_upload(path: &Path) -> Result<tokio::fs::File, AppError> {
    tokio::fs::File::open(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::NotFound(format!("file {}", path.display()))
        } else {
            AppError::storage(format!("Failed to open {}", path.display()), e)
        }
    })
}

/// One-line failure report: `error[CODE]: message`.
pub fn format_failure(err: &AppError) -> String {
    format!("error[{}]: {}", err.error_code(), err.detailed_message())
}
