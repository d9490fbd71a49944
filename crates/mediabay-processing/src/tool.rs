//! Guards for arguments handed to external tools

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};

const DANGEROUS_CHARS: [char; 11] = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
pub fn validate_path(path: &str) -> Result<()> {
    if path.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
        return Err(anyhow!("Path contains dangerous characters: {}", path));
    }

    if path.contains("..") {
        return Err(anyhow!("Path contains directory traversal: {}", path));
    }

    Ok(())
}

/// Validate the configured location of an executable.
pub fn validate_executable(name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(anyhow!("Invalid {} path: empty", name));
    }

    validate_path(path).with_context(|| format!("Invalid {} path", name))?;

    if !path.chars().all(|c| {
        c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\' || c == ' '
    }) {
        return Err(anyhow!("Invalid {} path: contains unsafe characters", name));
    }

    Ok(())
}

/// Absolute form of a media path passed as a tool argument.
///
/// Arguments never go through a shell, so the file name may hold any
/// character. A path that does not exist yet (an output) is resolved through
/// its parent directory, which must exist.
pub async fn canonicalize_media_path(path: &Path) -> Result<PathBuf> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        return tokio::fs::canonicalize(path)
            .await
            .with_context(|| format!("Failed to canonicalize {}", path.display()));
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("Path has no file name: {}", path.display()))?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let parent = tokio::fs::canonicalize(parent)
        .await
        .with_context(|| format!("Failed to canonicalize parent of {}", path.display()))?;

    Ok(parent.join(file_name))
}
