//! Embedding provider abstraction for semdex-core.
//!
//! - [`EmbeddingProvider`] is the seam the index manager embeds through.
//! - [`LazyEmbeddingProvider`] wraps the Candle model from `semdex-model` and
//!   constructs it on first use. Model loading dominates latency, so it
//!   happens at most once per provider, and a failed load is not retried.
//! - A `MockEmbeddingProvider` is available under `#[cfg(test)]` for
//!   exercising reindex and search flows without model weights.
//!
//! There is no silent fallback to a mock at runtime: a missing model surfaces
//! as `embedding_unavailable`.

use std::sync::OnceLock;

use semdex_model::{create_embedding_model, EmbeddingConfig, EmbeddingModel};
use tracing::info;

use crate::errors::{SemdexError, SemdexResult};
use crate::model_adapter::from_model_error;

// ============================================================================
// EmbeddingProvider
// ============================================================================

/// Produces fixed-dimension, L2-normalized vectors for text.
pub trait EmbeddingProvider: Send + Sync {
    /// Identifier of the model, recorded in index metadata.
    fn model_id(&self) -> &str;

    /// Output dimension. May initialize the model.
    fn dimension(&self) -> SemdexResult<usize>;

    /// Embed a batch of inputs, one vector per input, in order.
    fn embed_batch(&self, inputs: &[String]) -> SemdexResult<Vec<Vec<f32>>>;

    /// Embed a single input.
    fn embed(&self, input: &str) -> SemdexResult<Vec<f32>> {
        let results = self.embed_batch(&[input.to_string()])?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SemdexError::EmbeddingFailed {
                model_id: self.model_id().to_string(),
                reason: "embed_batch returned empty results".to_string(),
            })
    }
}

// ============================================================================
// LazyEmbeddingProvider
// ============================================================================

/// Candle-backed provider that loads its model on first use.
pub struct LazyEmbeddingProvider {
    config: EmbeddingConfig,
    model: OnceLock<Result<Box<dyn EmbeddingModel>, String>>,
}

impl std::fmt::Debug for LazyEmbeddingProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyEmbeddingProvider")
            .field("model_id", &self.config.model_id)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl LazyEmbeddingProvider {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            model: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    /// Whether a load has succeeded.
    pub fn is_loaded(&self) -> bool {
        matches!(self.model.get(), Some(Ok(_)))
    }

    fn model(&self) -> SemdexResult<&dyn EmbeddingModel> {
        let loaded = self.model.get_or_init(|| {
            info!("Loading embedding model {}", self.config.model_id);
            match create_embedding_model(&self.config) {
                Ok(model) => {
                    info!(
                        "Embedding model ready: {} ({} dimensions)",
                        model.model_id(),
                        model.dimension()
                    );
                    Ok(model)
                }
                Err(e) => Err(e.to_string()),
            }
        });

        match loaded {
            Ok(model) => Ok(&**model),
            Err(reason) => Err(SemdexError::EmbeddingUnavailable {
                model_id: self.config.model_id.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

impl EmbeddingProvider for LazyEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.config.model_id
    }

    fn dimension(&self) -> SemdexResult<usize> {
        Ok(self.model()?.dimension())
    }

    fn embed_batch(&self, inputs: &[String]) -> SemdexResult<Vec<Vec<f32>>> {
        let model = self.model()?;
        model
            .embed_batch(inputs)
            .map_err(|e| from_model_error(&self.config.model_id, e))
    }
}

// ============================================================================
// MockEmbeddingProvider (test only)
// ============================================================================

/// Deterministic provider: hashed vectors, with fixed overrides per input.
#[cfg(test)]
pub struct MockEmbeddingProvider {
    model_id: String,
    dimension: usize,
    overrides: std::collections::HashMap<String, Vec<f32>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            model_id: "mock-embedder".to_string(),
            dimension,
            overrides: std::collections::HashMap::new(),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Return `vector` (normalized) whenever the input equals `text`.
    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.overrides.insert(text.to_string(), normalize(vector));
        self
    }

    /// Number of `embed_batch` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn hash_to_embedding(&self, content: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dimension);
        for _ in 0..self.dimension {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            embedding.push(((state >> 33) as f32 / (u32::MAX as f32 / 2.0)) - 1.0);
        }
        normalize(embedding)
    }
}

#[cfg(test)]
fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

#[cfg(test)]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> SemdexResult<usize> {
        Ok(self.dimension)
    }

    fn embed_batch(&self, inputs: &[String]) -> SemdexResult<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(inputs
            .iter()
            .map(|s| {
                self.overrides
                    .get(s)
                    .cloned()
                    .unwrap_or_else(|| self.hash_to_embedding(s))
            })
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
