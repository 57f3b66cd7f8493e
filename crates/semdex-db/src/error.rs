//! Error types for semdex-db.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for semdex-db operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors that can occur in semdex-db operations.
#[derive(Debug, Error)]
pub enum DbError {
    // ========================================================================
    // Vector index errors
    // ========================================================================
    /// The vector blob could not be parsed (corrupt, truncated, foreign).
    #[error("Vector index parse error at {path}: {message}")]
    VectorParse { path: PathBuf, message: String },

    /// An in-memory index operation (add, remove, search, reserve) failed.
    #[error("Vector index operation '{op}' failed: {message}")]
    VectorOp { op: &'static str, message: String },

    /// Vector dimension mismatch.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// A persisted file does not exist.
    #[error("Index file not found at {path}")]
    IndexNotFound { path: PathBuf },

    // ========================================================================
    // Metadata errors
    // ========================================================================
    /// The metadata file could not be parsed or violates its invariants.
    #[error("Metadata parse error at {path}: {message}")]
    MetadataParse { path: PathBuf, message: String },

    /// The metadata file was written by a newer format version.
    #[error("Metadata at {path} has format version {found}; this build supports up to {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    /// A mutation would break the id/path bijection.
    #[error("Metadata conflict: {message}")]
    MetadataConflict { message: String },

    // ========================================================================
    // Persistence errors
    // ========================================================================
    /// Writing or renaming a persisted file failed.
    #[error("Failed to write {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DbError {
    /// Create a vector parse error.
    pub fn vector_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::VectorParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a vector operation error.
    pub fn vector_op(op: &'static str, message: impl Into<String>) -> Self {
        Self::VectorOp {
            op,
            message: message.into(),
        }
    }

    /// Create a metadata parse error.
    pub fn metadata_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MetadataParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a metadata conflict error.
    pub fn metadata_conflict(message: impl Into<String>) -> Self {
        Self::MetadataConflict {
            message: message.into(),
        }
    }

    /// Create a write failure error.
    pub fn write_failure(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WriteFailure {
            path: path.into(),
            message: message.into(),
        }
    }

    /// True when the persisted state cannot be trusted and must be rebuilt.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::VectorParse { .. } | Self::MetadataParse { .. } | Self::UnsupportedVersion { .. }
        )
    }
}
