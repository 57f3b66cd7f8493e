//! Adapter layer for semdex-db infrastructure.
//!
//! Storage errors carry file paths but not the index they belong to, so every
//! conversion here takes the index name alongside the error.
//!
//! ```text
//! semdex-core domain code (manager, reindex, search)
//!        ↓
//!   db_adapter (this module) - error conversion
//!        ↓
//!     semdex-db (usearch vectors, JSON metadata)
//! ```

use crate::errors::{SemdexError, SemdexResult};

/// Convert a semdex-db error into a domain error for `index`.
pub fn from_db_error(index: &str, err: semdex_db::DbError) -> SemdexError {
    use semdex_db::DbError;

    match err {
        DbError::Io(io_err) => SemdexError::Io(io_err),

        DbError::IndexNotFound { .. } => SemdexError::IndexNotFound {
            index: index.to_string(),
        },

        DbError::VectorParse { path, message } | DbError::MetadataParse { path, message } => {
            SemdexError::corrupt(index, path, message)
        }

        DbError::UnsupportedVersion {
            path,
            found,
            supported,
        } => SemdexError::corrupt(
            index,
            path,
            format!("metadata format version {found} is newer than supported version {supported}"),
        ),

        DbError::WriteFailure { path, message } => SemdexError::WriteFailure { path, message },

        DbError::DimensionMismatch { expected, actual } => SemdexError::Storage {
            message: format!(
                "vector dimension mismatch in index `{index}`: expected {expected}, got {actual}"
            ),
        },

        DbError::VectorOp { op, message } => SemdexError::Storage {
            message: format!("vector {op} failed in index `{index}`: {message}"),
        },

        DbError::MetadataConflict { message } => SemdexError::Storage {
            message: format!("metadata conflict in index `{index}`: {message}"),
        },

        DbError::Json(err) => SemdexError::Storage {
            message: format!("JSON error in index `{index}`: {err}"),
        },
    }
}

/// Extension trait for converting `DbResult<T>` into `SemdexResult<T>`.
pub trait IntoSemdexResult<T> {
    fn for_index(self, index: &str) -> SemdexResult<T>;
}

impl<T> IntoSemdexResult<T> for semdex_db::DbResult<T> {
    fn for_index(self, index: &str) -> SemdexResult<T> {
        self.map_err(|e| from_db_error(index, e))
    }
}
