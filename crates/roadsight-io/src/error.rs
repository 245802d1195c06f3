//! Errors raised by the IO collaborators.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while capturing, reading or writing.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// No frame could be captured.
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// An image file could not be opened or decoded.
    #[error("failed to load frame from {path}: {source}")]
    Decode {
        /// The file that failed.
        path: PathBuf,
        /// Underlying decoder error.
        source: image::ImageError,
    },

    /// The session directory could not be created.
    #[error("failed to create session directory {path}: {source}")]
    SessionDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },

    /// A record could not be appended to the session log.
    #[error("failed to write session log: {0}")]
    LogWrite(#[from] io::Error),

    /// A record could not be serialized.
    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A preview image could not be written.
    #[error("failed to write preview {path}: {source}")]
    Preview {
        /// Destination file.
        path: PathBuf,
        /// Underlying encoder error.
        source: image::ImageError,
    },
}
