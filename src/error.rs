//! Error types for wp-check

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while auditing WordPress installations
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read a file from disk
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was neither UTF-8 nor decodable with the detected encoding
    #[error("could not determine a working encoding for {}", path.display())]
    FileEncoding { path: PathBuf },

    /// Failed to list a directory
    #[error("failed to list {}: {source}", path.display())]
    DirList {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid URL
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Failed to create HTTP client
    #[error("failed to create HTTP client: {0}")]
    HttpClient(String),

    /// Report output failed
    #[error("output failed: {0}")]
    Output(#[source] std::io::Error),
}
