//! Error types for canvas operations.

use thiserror::Error;

/// Result type for canvas operations.
pub type CanvasResult<T> = Result<T, CanvasError>;

/// Errors that can occur in canvas operations.
///
/// Gesture input never produces one of these: invalid targets are ignored
/// and out-of-range transforms are clamped.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Layer not found in scene.
    #[error("Layer not found: {0}")]
    LayerNotFound(String),

    /// Configuration values are inconsistent or out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Artwork for a single layer could not be fetched or decoded.
    #[error("Failed to load image: {0}")]
    ImageLoad(String),

    /// A persisted record describes content the engine does not render.
    #[error("Unsupported record kind '{kind}' for {id}")]
    UnsupportedRecord {
        /// Record identifier.
        id: String,
        /// The record's `type` field.
        kind: String,
    },

    /// A persisted record is malformed.
    #[error("Invalid record {id}: {reason}")]
    InvalidRecord {
        /// Record identifier as it appeared on the wire.
        id: String,
        /// What was wrong with it.
        reason: String,
    },

    /// No async runtime was available to run a load on.
    #[error("Async runtime unavailable: {0}")]
    Runtime(String),

    /// Design serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Reading a configuration or design file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
