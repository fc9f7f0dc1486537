//! Custom error types for apkgscan.

use thiserror::Error;

/// Errors that can occur while unpacking and scanning a deck archive.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Not a valid zip archive: {0}")]
    InvalidArchive(String),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("File not found: {0}")]
    MissingFile(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}
