use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use uuid::Uuid;

use crate::error::{StorageError, StorageResult};

#[cfg(unix)]
const WORKSPACE_DIR_MODE: u32 = 0o755;

/// Owns the upload root and every workspace directory beneath it
#[derive(Clone, Debug)]
pub struct WorkspaceManager {
    root: PathBuf,
}

impl WorkspaceManager {
    /// Create a manager rooted at `root`. Nothing is created on disk until a
    /// workspace is ensured.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `{root}/{workspace_id}`
    pub fn workspace_path(&self, workspace_id: Uuid) -> PathBuf {
        self.root.join(workspace_id.to_string())
    }

    /// Create the workspace directory (and the root) if missing.
    ///
    /// Idempotent, and safe when several callers race on the same id: an
    /// already existing directory counts as success.
    pub async fn ensure_workspace(&self, workspace_id: Uuid) -> StorageResult<PathBuf> {
        let path = self.workspace_path(workspace_id);

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(WORKSPACE_DIR_MODE);

        builder
            .create(&path)
            .await
            .map_err(|source| StorageError::CreateWorkspaceFailed {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            workspace_id = %workspace_id,
            path = %path.display(),
            "Workspace ensured"
        );

        Ok(path)
    }

    pub async fn workspace_exists(&self, workspace_id: Uuid) -> bool {
        fs::metadata(self.workspace_path(workspace_id))
            .await
            .map(|meta| meta.is_dir())
            .unwrap_or(false)
    }

    /// Stream `reader` into `{dir}/{file_name}` and fsync it.
    ///
    /// The file is only created once the stream has yielded its first byte,
    /// so an empty upload leaves nothing behind. Returns the written path and
    /// its size in bytes.
    pub async fn write_original<R>(
        &self,
        dir: &Path,
        file_name: &str,
        reader: R,
    ) -> StorageResult<(PathBuf, u64)>
    where
        R: AsyncRead + Unpin,
    {
        validate_file_name(file_name)?;
        let path = dir.join(file_name);
        let start = std::time::Instant::now();

        let mut reader = BufReader::new(reader);
        let first_chunk = reader
            .fill_buf()
            .await
            .map_err(|source| StorageError::ReadFailed { source })?;
        if first_chunk.is_empty() {
            return Err(StorageError::EmptyUpload);
        }

        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        let bytes_copied = tokio::io::copy_buf(&mut reader, &mut file)
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        file.flush()
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: path.clone(),
                source,
            })?;
        file.sync_all()
            .await
            .map_err(|source| StorageError::WriteFailed {
                path: path.clone(),
                source,
            })?;

        tracing::info!(
            path = %path.display(),
            size_bytes = bytes_copied,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Original persisted"
        );

        Ok((path, bytes_copied))
    }

    /// Best-effort removal of files written by an aborted upload. Missing
    /// files are skipped; other failures are logged and the rest still go.
    /// Returns how many files were actually removed.
    pub async fn remove_artifacts(&self, paths: &[PathBuf]) -> usize {
        let mut removed = 0;
        for path in paths {
            match remove_file(path).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to remove artifact"
                    );
                }
            }
        }
        removed
    }
}

async fn remove_file(path: &Path) -> StorageResult<bool> {
    match fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Artifact removed");
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StorageError::DeleteFailed {
            path: path.to_path_buf(),
            source,
        }),
    }
}

fn validate_file_name(file_name: &str) -> StorageResult<()> {
    if file_name.is_empty()
        || file_name.contains("..")
        || file_name.contains('/')
        || file_name.contains('\\')
    {
        return Err(StorageError::InvalidFileName(file_name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_ensure_workspace_creates_directory() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path().join("uploads"));
        let id = Uuid::new_v4();

        let path = manager.ensure_workspace(id).await.unwrap();

        assert_eq!(path, dir.path().join("uploads").join(id.to_string()));
        assert!(path.is_dir());
        assert!(manager.workspace_exists(id).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_ensure_workspace_mode_is_not_wider_than_0755() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let path = manager.ensure_workspace(Uuid::new_v4()).await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !0o755, 0);
    }

    #[tokio::test]
    async fn test_ensure_workspace_is_idempotent() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let id = Uuid::new_v4();

        let first = manager.ensure_workspace(id).await.unwrap();
        std::fs::write(first.join("keep.txt"), b"x").unwrap();
        let second = manager.ensure_workspace(id).await.unwrap();

        assert_eq!(first, second);
        assert!(second.join("keep.txt").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_workspace_concurrent_callers() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let id = Uuid::new_v4();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure_workspace(id).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_ensure_workspace_fails_when_root_is_a_file() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("not-a-dir");
        std::fs::write(&root, b"occupied").unwrap();
        let manager = WorkspaceManager::new(&root);

        let result = manager.ensure_workspace(Uuid::new_v4()).await;

        assert!(matches!(
            result,
            Err(StorageError::CreateWorkspaceFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_original_streams_bytes() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let ws = manager.ensure_workspace(Uuid::new_v4()).await.unwrap();
        let data = vec![7u8; 200_000];

        let (path, size) = manager
            .write_original(&ws, "asset.jpg", &data[..])
            .await
            .unwrap();

        assert_eq!(size, 200_000);
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[tokio::test]
    async fn test_write_original_rejects_empty_stream() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let ws = manager.ensure_workspace(Uuid::new_v4()).await.unwrap();

        let result = manager.write_original(&ws, "asset.jpg", &b""[..]).await;

        assert!(matches!(result, Err(StorageError::EmptyUpload)));
        assert!(!ws.join("asset.jpg").exists());
    }

    #[tokio::test]
    async fn test_write_original_rejects_traversal() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let ws = manager.ensure_workspace(Uuid::new_v4()).await.unwrap();

        let result = manager
            .write_original(&ws, "../escape.jpg", &b"data"[..])
            .await;

        assert!(matches!(result, Err(StorageError::InvalidFileName(_))));
    }

    #[tokio::test]
    async fn test_remove_artifacts_skips_missing_files() {
        let dir = tempdir().unwrap();
        let manager = WorkspaceManager::new(dir.path());
        let present = dir.path().join("a.jpg");
        std::fs::write(&present, b"x").unwrap();

        let removed = manager
            .remove_artifacts(&[present.clone(), dir.path().join("missing.jpg")])
            .await;

        assert_eq!(removed, 1);
        assert!(!present.exists());
    }
}
