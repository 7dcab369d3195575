//! Common error types for FCLab

use thiserror::Error;
use uuid::Uuid;

/// Common result type for FCLab operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across FCLab services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Image does not exist in the pool
    #[error("Image not found: {0}")]
    ImageNotFound(Uuid),

    /// Annotator has never interacted with the engine
    #[error("Annotator not found: {0}")]
    AnnotatorNotFound(String),

    /// Candidate pool is empty once seen images are excluded
    #[error("No task available for annotator {0}")]
    NoTaskAvailable(String),

    /// Annotator reliability is below the voting floor; no vote was recorded
    #[error("Reliability {reliability:.3} is below the voting floor {floor:.3}")]
    InsufficientReliability { reliability: f64, floor: f64 },

    /// Image bytes are gone from the blob store; the image was removed from the pool
    #[error("Blob missing for image {0}")]
    BlobMissing(Uuid),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}
