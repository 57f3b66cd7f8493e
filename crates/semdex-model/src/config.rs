//! Configuration types for semdex-model.
//!
//! `EmbeddingConfig` is deserialized from the `embedding:` section of the
//! engine config; every field has a serde default so a partial section works.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::model_locator::{short_model_name, ModelLocator, EMBEDDINGS_SUBDIR};
use crate::DEFAULT_EMBEDDING_MODEL_ID;

// ============================================================================
// DevicePreference
// ============================================================================

/// Preference for compute device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// GPU if one was compiled in and is present, else CPU.
    #[default]
    Auto,
    /// Metal on macOS, CUDA elsewhere. Fails if unavailable.
    Gpu,
    Cpu,
}

impl DevicePreference {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "gpu" | "metal" | "cuda" => Ok(Self::Gpu),
            "cpu" => Ok(Self::Cpu),
            _ => Err(format!(
                "Unknown device: '{}'. Use 'auto', 'gpu', or 'cpu'.",
                s
            )),
        }
    }
}

// ============================================================================
// PoolingStrategy
// ============================================================================

/// How token embeddings are reduced to one document vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolingStrategy {
    /// CLS for the BGE family, mean for everything else.
    #[default]
    Auto,
    /// Attention-masked mean over all tokens (sentence-transformers style).
    Mean,
    /// Hidden state of the first token.
    Cls,
}

impl PoolingStrategy {
    /// Resolve `Auto` against a model ID.
    pub fn resolve(self, model_id: &str) -> PoolingStrategy {
        match self {
            Self::Auto => {
                if model_id.to_lowercase().contains("bge-") {
                    Self::Cls
                } else {
                    Self::Mean
                }
            }
            other => other,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Mean => "mean",
            Self::Cls => "cls",
        }
    }
}

impl std::fmt::Display for PoolingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ModelArchitecture
// ============================================================================

/// Transformer family, inferred from the model's config.json.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelArchitecture {
    #[default]
    Bert,
    Roberta,
    Unknown,
}

impl ModelArchitecture {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bert => "bert",
            Self::Roberta => "roberta",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ModelArchitecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ModelInfo
// ============================================================================

/// Identity and shape of a loaded model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_id: String,
    /// Embedding dimension (hidden size).
    pub dimension: usize,
    pub max_seq_len: usize,
    #[serde(default)]
    pub architecture: ModelArchitecture,
    #[serde(default)]
    pub pooling: PoolingStrategy,
}

impl ModelInfo {
    pub fn new(model_id: impl Into<String>, dimension: usize, max_seq_len: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension,
            max_seq_len,
            architecture: ModelArchitecture::default(),
            pooling: PoolingStrategy::Mean,
        }
    }

    pub fn with_architecture(mut self, arch: ModelArchitecture) -> Self {
        self.architecture = arch;
        self
    }

    pub fn with_pooling(mut self, pooling: PoolingStrategy) -> Self {
        self.pooling = pooling;
        self
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Hugging Face model ID (e.g., "BAAI/bge-base-en-v1.5").
    #[serde(default = "default_embedding_model_id")]
    pub model_id: String,

    #[serde(default)]
    pub device: DevicePreference,

    /// Explicit model directory. Bypasses the model locator when set.
    #[serde(default)]
    pub local_path: Option<PathBuf>,

    /// Token limit per input; longer documents are truncated.
    #[serde(default = "default_max_seq_len")]
    pub max_sequence_length: usize,

    #[serde(default)]
    pub pooling: PoolingStrategy,

    /// Number of documents embedded per forward pass.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_embedding_model_id() -> String {
    DEFAULT_EMBEDDING_MODEL_ID.to_string()
}

fn default_max_seq_len() -> usize {
    512
}

fn default_batch_size() -> usize {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_embedding_model_id(),
            device: DevicePreference::default(),
            local_path: None,
            max_sequence_length: default_max_seq_len(),
            pooling: PoolingStrategy::default(),
            batch_size: default_batch_size(),
        }
    }
}

impl EmbeddingConfig {
    /// Resolve the model directory.
    ///
    /// An explicit `local_path` wins; otherwise the locator search order
    /// applies. When nothing is found the conventional user location is
    /// returned so the caller's "not found" error names a useful path.
    pub fn effective_model_path(&self) -> PathBuf {
        if let Some(ref path) = self.local_path {
            return path.clone();
        }

        match ModelLocator::new().embedding_model_path(&self.model_id) {
            Ok(path) => path,
            Err(_) => dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".semdex")
                .join("models")
                .join(EMBEDDINGS_SUBDIR)
                .join(short_model_name(&self.model_id)),
        }
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }
}

// ============================================================================
// HuggingFaceModelConfig
// ============================================================================

/// The subset of a Hugging Face config.json needed to pick a loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceModelConfig {
    #[serde(default)]
    pub architectures: Vec<String>,
    #[serde(default)]
    pub hidden_size: usize,
    #[serde(default = "default_max_position")]
    pub max_position_embeddings: usize,
    #[serde(default)]
    pub model_type: String,
}

fn default_max_position() -> usize {
    512
}

impl HuggingFaceModelConfig {
    pub fn infer_architecture(&self) -> ModelArchitecture {
        for arch in &self.architectures {
            let lower = arch.to_lowercase();
            if lower.contains("roberta") {
                return ModelArchitecture::Roberta;
            }
            if lower.contains("bert") {
                return ModelArchitecture::Bert;
            }
        }

        match self.model_type.to_lowercase().as_str() {
            "bert" => ModelArchitecture::Bert,
            "roberta" | "xlm-roberta" => ModelArchitecture::Roberta,
            _ => ModelArchitecture::Unknown,
        }
    }
}
