use thiserror::Error;

/// Errors produced by blob store implementations.
#[derive(Error, Debug)]
pub enum BlobError {
    #[error("Empty blob")]
    Empty,

    #[error("Blob too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid blob path: {0}")]
    InvalidPath(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
