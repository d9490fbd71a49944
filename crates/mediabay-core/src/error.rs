//! Error types module
//!
//! Every component of the ingest pipeline reports failures through `AppError`.
//! Each variant belongs to exactly one `ErrorKind`, and `ErrorMetadata` maps
//! that kind to the status code a transport layer should return. The core
//! never formats wire responses itself.

use std::io;

use serde::Serialize;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// The five failure categories shared by all components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Caller-supplied data was missing or malformed.
    InvalidInput,
    /// A filesystem operation failed.
    Storage,
    /// An external tool or media capability failed.
    Processing,
    /// A referenced resource does not exist.
    NotFound,
    /// Anything else.
    Internal,
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden from clients
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("Processing error: {message}")]
    Processing {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error: {message}")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl AppError {
    pub fn storage(message: impl Into<String>, source: io::Error) -> Self {
        AppError::Storage {
            message: message.into(),
            source,
        }
    }

    pub fn processing(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        AppError::Processing {
            message: message.into(),
            source: source.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::Storage { .. } => ErrorKind::Storage,
            AppError::Processing { .. } => ErrorKind::Processing,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => ErrorKind::Internal,
        }
    }

    /// Get the error type name for detailed error output
    pub fn error_type(&self) -> &str {
        match self {
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Storage { .. } => "Storage",
            AppError::Processing { .. } => "Processing",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage {
            message: "I/O failure".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata per kind: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn kind_static_metadata(
    kind: ErrorKind,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match kind {
        ErrorKind::InvalidInput => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::Storage => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Check free space and permissions on the upload root"),
            true,
            LogLevel::Error,
        ),
        ErrorKind::Processing => (
            500,
            "PROCESSING_ERROR",
            false,
            Some("Check the media file and the external tool installation"),
            false,
            LogLevel::Warn,
        ),
        ErrorKind::NotFound => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource exists"),
            false,
            LogLevel::Debug,
        ),
        ErrorKind::Internal => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        kind_static_metadata(self.kind()).0
    }

    fn error_code(&self) -> &'static str {
        kind_static_metadata(self.kind()).1
    }

    fn is_recoverable(&self) -> bool {
        kind_static_metadata(self.kind()).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        kind_static_metadata(self.kind()).3
    }

    fn is_sensitive(&self) -> bool {
        kind_static_metadata(self.kind()).4
    }

    fn log_level(&self) -> LogLevel {
        kind_static_metadata(self.kind()).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Storage { .. } => "Failed to access storage".to_string(),
            AppError::Processing { ref message, .. } => message.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
