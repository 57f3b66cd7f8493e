//! # semdex-model
//!
//! ML inference layer for semdex: turns document bodies and queries into
//! fixed-dimension, L2-normalized embedding vectors.
//!
//! ## Components
//!
//! - **`EmbeddingModel`**: the bi-encoder trait the engine depends on
//! - **`CandleEmbeddingModel`**: local Candle inference (BERT / XLM-RoBERTa)
//! - **`ModelLocator`**: runtime path resolution for installed models
//! - **`EmbeddingConfig`**: the `embedding:` section of the engine config
//!
//! This crate ships no test doubles; consumers provide their own.
//!
//! ## Model Location
//!
//! 1. `$SEMDEX_MODELS_DIR`
//! 2. `~/.semdex/models`
//! 3. `{exe_dir}/models`
//!
//! ## Features
//!
//! - `embedded` (default): Candle inference
//! - `metal` / `cuda`: GPU acceleration
//!
//! ## Usage
//!
//! ```ignore
//! use semdex_model::{create_embedding_model, EmbeddingConfig};
//!
//! let model = create_embedding_model(&EmbeddingConfig::default())?;
//! let vectors = model.embed(&["How do we rotate API keys?"])?;
//! assert_eq!(vectors[0].len(), model.dimension());
//! ```

pub mod config;
pub mod error;
pub mod model_locator;

#[cfg(feature = "embedded")]
mod embedding;

pub use error::{ModelError, ModelResult};

pub use config::{
    DevicePreference, EmbeddingConfig, HuggingFaceModelConfig, ModelArchitecture, ModelInfo,
    PoolingStrategy,
};

pub use model_locator::{
    ModelLocator, EMBEDDINGS_SUBDIR, REQUIRED_MODEL_FILES, SEMDEX_MODELS_DIR_ENV,
};

#[cfg(feature = "embedded")]
pub use embedding::CandleEmbeddingModel;

/// Default embedding model (768-dimensional, BERT base).
pub const DEFAULT_EMBEDDING_MODEL_ID: &str = "BAAI/bge-base-en-v1.5";

// ============================================================================
// Embedding Model Trait
// ============================================================================

/// A bi-encoder producing one normalized vector per input text.
pub trait EmbeddingModel: Send + Sync + std::fmt::Debug {
    /// Embed a batch of texts. Each output has length `dimension()`.
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>>;

    /// Owned-string convenience over [`embed`](Self::embed).
    fn embed_batch(&self, texts: &[String]) -> ModelResult<Vec<Vec<f32>>> {
        let refs: Vec<&str> = texts.iter().map(|s| s.as_str()).collect();
        self.embed(&refs)
    }

    fn dimension(&self) -> usize;

    fn max_sequence_length(&self) -> usize;

    fn model_info(&self) -> &ModelInfo;

    fn model_id(&self) -> &str {
        &self.model_info().model_id
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Load the embedding model described by `config`.
///
/// This is the expensive step (weights are mapped and the graph built), so
/// callers should do it once per process.
#[cfg(feature = "embedded")]
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    let model = embedding::CandleEmbeddingModel::new(config)?;
    Ok(Box::new(model))
}

#[cfg(not(feature = "embedded"))]
pub fn create_embedding_model(config: &EmbeddingConfig) -> ModelResult<Box<dyn EmbeddingModel>> {
    Err(ModelError::ProviderNotAvailable {
        provider: config.model_id.clone(),
        reason: "semdex-model was built without the 'embedded' feature".to_string(),
    })
}
