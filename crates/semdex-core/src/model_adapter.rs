//! Adapter layer for semdex-model infrastructure.
//!
//! Anything that stops the model from being constructed maps to
//! `EmbeddingUnavailable`; failures of an already-loaded model map to
//! `EmbeddingFailed`.

use crate::errors::SemdexError;

/// Convert a semdex-model error to a semdex-core error.
///
/// `model_id` is the configured model, used when the error does not name one.
pub fn from_model_error(model_id: &str, err: semdex_model::ModelError) -> SemdexError {
    use semdex_model::ModelError;

    if err.is_initialization() {
        let model_id = match &err {
            ModelError::ModelNotFound { model_id, .. } | ModelError::ModelLoad { model_id, .. } => {
                model_id.clone()
            }
            _ => model_id.to_string(),
        };
        return SemdexError::EmbeddingUnavailable {
            model_id,
            reason: err.to_string(),
        };
    }

    match err {
        ModelError::EmbeddingFailed { model_id, message } => {
            SemdexError::EmbeddingFailed {
                model_id,
                reason: message,
            }
        }
        other => SemdexError::EmbeddingFailed {
            model_id: model_id.to_string(),
            reason: other.to_string(),
        },
    }
}
