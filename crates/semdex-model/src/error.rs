//! Error types for semdex-model.
//!
//! Discovery errors carry enough context to tell the user where models were
//! looked for and how to install them.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for semdex-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur while locating, loading or running a model.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Model discovery errors
    // ========================================================================
    /// No models directory found in any search location.
    #[error("{}", format_models_dir_not_found(.searched))]
    ModelsDirectoryNotFound { searched: Vec<PathBuf> },

    /// Model files not found at expected location.
    #[error("{}", format_model_not_found(.model_id, .path))]
    ModelNotFound { model_id: String, path: PathBuf },

    /// Model directory exists but is missing required files.
    #[error("{}", format_incomplete_model(.path, .missing))]
    IncompleteModelFiles {
        path: PathBuf,
        missing: Vec<&'static str>,
    },

    // ========================================================================
    // Model loading errors
    // ========================================================================
    /// Failed to load model weights or tokenizer.
    #[error("Failed to load model '{model_id}': {message}")]
    ModelLoad { model_id: String, message: String },

    /// The model's config.json could not be interpreted.
    #[error("Invalid model configuration: {message}")]
    InvalidConfig { message: String },

    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Tokenization failed.
    #[error("Tokenization failed: {message}")]
    Tokenization { message: String },

    /// Embedding generation failed.
    #[error("Embedding failed for model '{model_id}': {message}")]
    EmbeddingFailed { model_id: String, message: String },

    // ========================================================================
    // Provider errors
    // ========================================================================
    /// No inference backend compiled in.
    #[error("Provider '{provider}' not available: {reason}")]
    ProviderNotAvailable { provider: String, reason: String },

    /// Requested compute device is not available.
    #[error("Compute device not available: {reason}\n\nSet `embedding.device: cpu` in .semdex/config.yaml to use CPU-only inference.")]
    DeviceNotAvailable { reason: String },

    // ========================================================================
    // I/O errors
    // ========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

// ============================================================================
// Error message formatters
// ============================================================================

fn format_models_dir_not_found(searched: &[PathBuf]) -> String {
    let list = searched
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  {}. {}", i + 1, p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Models directory not found.\n\n\
        Searched:\n\
        {list}\n\n\
        Set $SEMDEX_MODELS_DIR, or install models under ~/.semdex/models/."
    )
}

fn format_model_not_found(model_id: &str, path: &Path) -> String {
    format!(
        "Embedding model not found: {model_id}\n\n\
        Expected at: {}\n\n\
        The directory must contain config.json, model.safetensors and tokenizer.json.",
        path.display()
    )
}

fn format_incomplete_model(path: &Path, missing: &[&str]) -> String {
    format!(
        "Incomplete model installation at {} (missing: {})",
        path.display(),
        missing.join(", ")
    )
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create a model load error.
    pub fn model_load(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create an embedding failed error.
    pub fn embedding_failed(model_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            model_id: model_id.into(),
            message: message.into(),
        }
    }

    /// Create a tokenization error.
    pub fn tokenization(message: impl Into<String>) -> Self {
        Self::Tokenization {
            message: message.into(),
        }
    }

    /// True for errors raised before any inference ran: the model could not
    /// be found, loaded or placed on a device.
    pub fn is_initialization(&self) -> bool {
        matches!(
            self,
            Self::ModelsDirectoryNotFound { .. }
                | Self::ModelNotFound { .. }
                | Self::IncompleteModelFiles { .. }
                | Self::ModelLoad { .. }
                | Self::InvalidConfig { .. }
                | Self::ProviderNotAvailable { .. }
                | Self::DeviceNotAvailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_dir_message_lists_locations() {
        let err = ModelError::ModelsDirectoryNotFound {
            searched: vec![PathBuf::from("/a/models"), PathBuf::from("/b/models")],
        };
        let msg = err.to_string();
        assert!(msg.contains("1. /a/models"));
        assert!(msg.contains("2. /b/models"));
        assert!(msg.contains("SEMDEX_MODELS_DIR"));
    }

    #[test]
    fn test_initialization_classification() {
        assert!(ModelError::model_load("m", "boom").is_initialization());
        assert!(!ModelError::embedding_failed("m", "boom").is_initialization());
        assert!(!ModelError::tokenization("bad input").is_initialization());
    }
}
