//! Batch thumbnailing of an existing directory
//!
//! A fixed number of workers drain a shared queue of file paths and call the
//! resizer for each. The call returns only after every worker has finished.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use mediabay_core::AppError;

use crate::image::jpeg_destination;
use crate::traits::Resizer;

/// Extensions picked up by a batch run, compared case-insensitively.
pub const BATCH_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "heic", "png"];

/// Name of the output directory used when none is given.
pub const DEFAULT_OUTPUT_DIR: &str = "thumbnails";

/// Counts after a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub queued: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl std::ops::Add for BatchReport {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            queued: self.queued + other.queued,
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
        }
    }
}

#[derive(Clone)]
pub struct BatchThumbnailer {
    resizer: Arc<dyn Resizer>,
    width: u32,
    workers: usize,
}

/// A source file and the thumbnail path it writes
#[derive(Debug, Clone, PartialEq, Eq)]
struct BatchJob {
    source: PathBuf,
    dest: PathBuf,
}

type SharedQueue = Arc<Mutex<mpsc::Receiver<BatchJob>>>;

impl BatchThumbnailer {
    /// `workers` is clamped to at least one.
    pub fn new(resizer: Arc<dyn Resizer>, width: u32, workers: usize) -> Self {
        Self {
            resizer,
            width,
            workers: workers.max(1),
        }
    }

    /// `<source>/thumbnails`
    pub fn default_output_dir(source_dir: &Path) -> PathBuf {
        source_dir.join(DEFAULT_OUTPUT_DIR)
    }

    /// Thumbnail every eligible file directly inside `source_dir` into
    /// `output_dir`, keeping the file name and forcing a `.jpg` extension.
    ///
    /// `output_dir` must not be `source_dir`. Files whose thumbnails would
    /// share a name (`a.jpg` and `a.png`) are thumbnailed once, for the first
    /// in sorted order; the others count as failed. Individual failures are
    /// logged and counted, never returned.
    pub async fn run(&self, source_dir: &Path, output_dir: &Path) -> Result<BatchReport, AppError> {
        if !tokio::fs::try_exists(source_dir).await.unwrap_or(false) {
            return Err(AppError::NotFound(format!(
                "source directory {}",
                source_dir.display()
            )));
        }
        ensure_distinct_dirs(source_dir, output_dir).await?;

        let files = collect_batch_files(source_dir).await?;
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| {
                AppError::storage(
                    format!("Failed to create output directory {}", output_dir.display()),
                    e,
                )
            })?;

        let start = std::time::Instant::now();
        let (jobs, collisions) = plan_jobs(files, output_dir);
        tracing::info!(
            source = %source_dir.display(),
            output = %output_dir.display(),
            files = jobs.len() + collisions,
            workers = self.workers,
            width = self.width,
            "Batch thumbnailing started"
        );

        let mut report = BatchReport {
            queued: collisions,
            succeeded: 0,
            failed: collisions,
        };
        if jobs.is_empty() {
            return Ok(report);
        }

        let (tx, rx) = mpsc::channel(jobs.len());
        for job in jobs {
            // Capacity equals the job count, so this never waits.
            if tx.send(job).await.is_err() {
                return Err(AppError::Internal("Batch queue closed early".to_string()));
            }
        }
        drop(tx);

        let queue: SharedQueue = Arc::new(Mutex::new(rx));
        let mut handles = Vec::with_capacity(self.workers);
        for worker_id in 0..self.workers {
            let queue = queue.clone();
            let resizer = self.resizer.clone();
            let width = self.width;
            handles.push(tokio::spawn(async move {
                drain_queue(worker_id, queue, resizer, width).await
            }));
        }

        for handle in handles {
            match handle.await {
                Ok(counts) => report = report + counts,
                Err(e) => tracing::error!(error = %e, "Batch worker panicked"),
            }
        }

        tracing::info!(
            queued = report.queued,
            succeeded = report.succeeded,
            failed = report.failed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch thumbnailing finished"
        );

        Ok(report)
    }
}

async fn drain_queue(
    worker_id: usize,
    queue: SharedQueue,
    resizer: Arc<dyn Resizer>,
    width: u32,
) -> BatchReport {
    let mut report = BatchReport::default();

    loop {
        // Lock only for the pop; the resize runs unlocked.
        let next = queue.lock().await.recv().await;
        let Some(BatchJob { source, dest }) = next else {
            break;
        };
        report.queued += 1;

        match resizer.resize(&source, width, &dest).await {
            Ok(path) => {
                report.succeeded += 1;
                tracing::info!(
                    worker_id,
                    source = %source.display(),
                    path = %path.display(),
                    "Batch thumbnail written"
                );
            }
            Err(e) => {
                report.failed += 1;
                tracing::warn!(
                    worker_id,
                    source = %source.display(),
                    error = %format!("{:#}", e),
                    "Batch thumbnail failed"
                );
            }
        }
    }

    report
}

/// Thumbnails written into the source directory would replace the originals.
async fn ensure_distinct_dirs(source_dir: &Path, output_dir: &Path) -> Result<(), AppError> {
    let source = tokio::fs::canonicalize(source_dir).await.map_err(|e| {
        AppError::storage(format!("Failed to resolve {}", source_dir.display()), e)
    })?;

    // An output directory that does not exist yet cannot be the source.
    if let Ok(output) = tokio::fs::canonicalize(output_dir).await {
        if output == source {
            return Err(AppError::InvalidInput(format!(
                "Output directory {} is the source directory",
                output_dir.display()
            )));
        }
    }

    Ok(())
}

/// Pair each file with its thumbnail path. Later files whose path is already
/// taken are logged and left out; the second value counts them.
fn plan_jobs(files: Vec<PathBuf>, output_dir: &Path) -> (Vec<BatchJob>, usize) {
    let mut taken = HashSet::new();
    let mut jobs = Vec::with_capacity(files.len());
    let mut collisions = 0;

    for source in files {
        let Some(file_name) = source.file_name() else {
            collisions += 1;
            continue;
        };
        let dest = jpeg_destination(&output_dir.join(file_name));
        if !taken.insert(dest.clone()) {
            collisions += 1;
            tracing::warn!(
                source = %source.display(),
                path = %dest.display(),
                "Batch thumbnail skipped, name already used by another file"
            );
            continue;
        }
        jobs.push(BatchJob { source, dest });
    }

    (jobs, collisions)
}

/// Regular files directly inside `dir` with a batch extension, sorted.
async fn collect_batch_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        AppError::storage(format!("Failed to read directory {}", dir.display()), e)
    })?;

    let mut files = Vec::new();
    loop {
        let entry = entries.next_entry().await.map_err(|e| {
            AppError::storage(format!("Failed to read directory {}", dir.display()), e)
        })?;
        let Some(entry) = entry else {
            break;
        };

        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        let path = entry.path();
        if is_file && has_batch_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_batch_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            BATCH_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_batch_extension() {
        assert!(has_batch_extension(Path::new("a.jpg")));
        assert!(has_batch_extension(Path::new("a.JPEG")));
        assert!(has_batch_extension(Path::new("/x/IMG_0001.HEIC")));
        assert!(has_batch_extension(Path::new("b.png")));
        assert!(!has_batch_extension(Path::new("c.gif")));
        assert!(!has_batch_extension(Path::new("noext")));
        assert!(!has_batch_extension(Path::new("clip.mp4")));
    }

    #[test]
    fn test_report_addition() {
        let a = BatchReport {
            queued: 2,
            succeeded: 1,
            failed: 1,
        };
        let b = BatchReport {
            queued: 3,
            succeeded: 3,
            failed: 0,
        };
        assert_eq!(
            a + b,
            BatchReport {
                queued: 5,
                succeeded: 4,
                failed: 1
            }
        );
    }

    #[test]
    fn test_plan_jobs_skips_colliding_names() {
        let files = vec![
            PathBuf::from("/in/a.jpg"),
            PathBuf::from("/in/a.png"),
            PathBuf::from("/in/b.heic"),
            PathBuf::from("/in/b.jpeg"),
        ];

        let (jobs, collisions) = plan_jobs(files, Path::new("/out"));

        assert_eq!(collisions, 1);
        assert_eq!(
            jobs,
            vec![
                BatchJob {
                    source: PathBuf::from("/in/a.jpg"),
                    dest: PathBuf::from("/out/a.jpg"),
                },
                BatchJob {
                    source: PathBuf::from("/in/b.heic"),
                    dest: PathBuf::from("/out/b.jpg"),
                },
                BatchJob {
                    source: PathBuf::from("/in/b.jpeg"),
                    dest: PathBuf::from("/out/b.jpeg"),
                },
            ]
        );
    }

    #[test]
    fn test_default_output_dir() {
        assert_eq!(
            BatchThumbnailer::default_output_dir(Path::new("/photos")),
            PathBuf::from("/photos/thumbnails")
        );
    }
}
