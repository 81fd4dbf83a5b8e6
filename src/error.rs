//! Error types for linetail

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for linetail operations
pub type Result<T> = std::result::Result<T, TailError>;

/// Errors that can occur during inode lookup or tailing
#[derive(Error, Debug)]
pub enum TailError {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid path provided
    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    /// Capability not available on this platform
    #[error("Unsupported on this platform: {0}")]
    Unsupported(&'static str),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TailError {
    /// Check whether the error indicates the target path does not exist.
    ///
    /// The tailer treats a missing file differently from other I/O
    /// failures: it waits for the file to appear instead of bailing out.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TailError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }
}
