//! Error types for semdex-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for semdex-core operations.
pub type SemdexResult<T> = Result<T, SemdexError>;

/// Domain errors surfaced by the index manager.
#[derive(Error, Debug)]
pub enum SemdexError {
    /// Search or incremental reindex before any full reindex.
    #[error("Index `{index}` has not been built yet. Run a full reindex first.")]
    IndexNotFound { index: String },

    /// The name is not in the index registry.
    #[error("Unknown index `{0}`.")]
    UnknownIndex(String),

    /// The embedding model could not be initialized.
    #[error("Embedding model `{model_id}` is unavailable: {reason}")]
    EmbeddingUnavailable { model_id: String, reason: String },

    /// The model loaded but inference failed.
    #[error("Embedding with model `{model_id}` failed: {reason}")]
    EmbeddingFailed { model_id: String, reason: String },

    /// The index was built with a different model than the active one.
    #[error("Embedding model mismatch for index `{index}`: index uses `{index_model}` ({index_dimension}d), active is `{active_model}` ({active_dimension}d). Run a full reindex.")]
    EmbeddingModelMismatch {
        index: String,
        index_model: String,
        index_dimension: usize,
        active_model: String,
        active_dimension: usize,
    },

    /// A persisted file could not be parsed or the pair is inconsistent.
    #[error("Index `{index}` is corrupt at `{path}`: {message}. Run a full reindex.")]
    CorruptIndex {
        index: String,
        path: PathBuf,
        message: String,
    },

    /// Persisting the index failed; the previous state is still in place.
    #[error("Failed to write `{path}`: {message}")]
    WriteFailure { path: PathBuf, message: String },

    /// The advisory lock could not be taken.
    #[error("Failed to lock `{path}`: {message}")]
    IndexLock { path: PathBuf, message: String },

    /// A document could not be read from the working tree.
    #[error("Failed to read document `{path}`: {message}")]
    DocumentRead { path: String, message: String },

    /// Walking an index root failed.
    #[error("Failed to scan `{root}`: {message}")]
    Discovery { root: PathBuf, message: String },

    /// A configuration value cannot work.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration { message: String, hint: String },

    /// The engine config file exists but cannot be read or parsed.
    #[error("Config file `{path}` is invalid: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Vector or metadata operation failed for a reason other than corruption.
    #[error("Index storage error: {message}")]
    Storage { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stable, machine-readable classification of a [`SemdexError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IndexNotFound,
    UnknownIndex,
    EmbeddingUnavailable,
    EmbeddingFailed,
    EmbeddingMismatch,
    CorruptIndex,
    WriteFailure,
    Lock,
    InvalidConfig,
    Io,
    Internal,
}

impl ErrorKind {
    /// snake_case code for callers that report errors as data.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::IndexNotFound => "index_not_found",
            ErrorKind::UnknownIndex => "unknown_index",
            ErrorKind::EmbeddingUnavailable => "embedding_unavailable",
            ErrorKind::EmbeddingFailed => "embedding_failed",
            ErrorKind::EmbeddingMismatch => "embedding_mismatch",
            ErrorKind::CorruptIndex => "corrupt_index",
            ErrorKind::WriteFailure => "write_failure",
            ErrorKind::Lock => "lock_failed",
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl SemdexError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SemdexError::IndexNotFound { .. } => ErrorKind::IndexNotFound,
            SemdexError::UnknownIndex(_) => ErrorKind::UnknownIndex,
            SemdexError::EmbeddingUnavailable { .. } => ErrorKind::EmbeddingUnavailable,
            SemdexError::EmbeddingFailed { .. } => ErrorKind::EmbeddingFailed,
            SemdexError::EmbeddingModelMismatch { .. } => ErrorKind::EmbeddingMismatch,
            SemdexError::CorruptIndex { .. } => ErrorKind::CorruptIndex,
            SemdexError::WriteFailure { .. } => ErrorKind::WriteFailure,
            SemdexError::IndexLock { .. } => ErrorKind::Lock,
            SemdexError::InvalidConfiguration { .. } | SemdexError::ConfigParse { .. } => {
                ErrorKind::InvalidConfig
            }
            SemdexError::DocumentRead { .. }
            | SemdexError::Discovery { .. }
            | SemdexError::Io(_) => ErrorKind::Io,
            SemdexError::Storage { .. } => ErrorKind::Internal,
        }
    }

    /// The four kinds that abort a whole operation by contract.
    pub fn is_structural(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::IndexNotFound
                | ErrorKind::EmbeddingUnavailable
                | ErrorKind::CorruptIndex
                | ErrorKind::WriteFailure
        )
    }

    pub fn invalid_config(message: impl Into<String>, hint: impl Into<String>) -> Self {
        SemdexError::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn corrupt(index: impl Into<String>, path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        SemdexError::CorruptIndex {
            index: index.into(),
            path: path.into(),
            message: message.into(),
        }
    }
}
