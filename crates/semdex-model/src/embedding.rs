//! Candle-based embedding model.

use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{
    DevicePreference, EmbeddingConfig, HuggingFaceModelConfig, ModelArchitecture, ModelInfo,
    PoolingStrategy,
};
use crate::error::{ModelError, ModelResult};
use crate::model_locator::ModelLocator;
use crate::EmbeddingModel;

enum ModelBackend {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

impl ModelBackend {
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            ModelBackend::Bert(model) => {
                model.forward(input_ids, token_type_ids, Some(attention_mask))
            }
            ModelBackend::Roberta(model) => {
                model.forward(input_ids, attention_mask, token_type_ids, None, None, None)
            }
        }
    }
}

/// Candle embedding model over BERT or XLM-RoBERTa weights.
///
/// Outputs are pooled (CLS or masked mean) and L2-normalized, so cosine
/// distance between two outputs is `1 - dot`.
pub struct CandleEmbeddingModel {
    model_info: ModelInfo,
    model: Mutex<ModelBackend>,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

impl std::fmt::Debug for CandleEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbeddingModel")
            .field("model_id", &self.model_info.model_id)
            .field("dimension", &self.model_info.dimension)
            .field("pooling", &self.model_info.pooling)
            .finish()
    }
}

// Candle tensors and the tokenizer are only touched behind the mutexes.
unsafe impl Send for CandleEmbeddingModel {}
unsafe impl Sync for CandleEmbeddingModel {}

impl CandleEmbeddingModel {
    /// Load the model described by `config` from disk.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        let model_path = config.effective_model_path();
        ModelLocator::new()
            .validate_model_dir(&model_path)
            .map_err(|e| match e {
                ModelError::ModelNotFound { path, .. } => ModelError::ModelNotFound {
                    model_id: config.model_id.clone(),
                    path,
                },
                other => other,
            })?;

        let hf_config = Self::load_hf_config(&model_path)?;
        let architecture = hf_config.infer_architecture();
        let dimension = hf_config.hidden_size;
        if dimension == 0 {
            return Err(ModelError::InvalidConfig {
                message: format!("hidden_size missing from {}", model_path.display()),
            });
        }
        let max_seq_len = config
            .max_sequence_length
            .min(hf_config.max_position_embeddings);
        let pooling = config.pooling.resolve(&config.model_id);

        info!(
            "Loading embedding model '{}' from {:?} (arch={}, dim={}, pooling={})",
            config.model_id, model_path, architecture, dimension, pooling
        );

        let (pad_id, pad_token) = match architecture {
            ModelArchitecture::Roberta => (1, "<pad>"),
            ModelArchitecture::Bert | ModelArchitecture::Unknown => (0, "[PAD]"),
        };

        let tokenizer = Self::load_tokenizer(&model_path, max_seq_len, pad_id, pad_token)?;
        let device = Self::select_device(config.device)?;
        let model = Self::load_model(&model_path, architecture, &device)?;

        let model_info = ModelInfo::new(&config.model_id, dimension, max_seq_len)
            .with_architecture(architecture)
            .with_pooling(pooling);

        Ok(Self {
            model_info,
            model: Mutex::new(model),
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn load_hf_config(model_path: &Path) -> ModelResult<HuggingFaceModelConfig> {
        let content = std::fs::read_to_string(model_path.join("config.json"))?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_tokenizer(
        model_path: &Path,
        max_length: usize,
        pad_id: u32,
        pad_token: &str,
    ) -> ModelResult<Tokenizer> {
        let load_err = |e: &dyn std::fmt::Display| {
            ModelError::model_load(model_path.display().to_string(), e.to_string())
        };

        let mut tokenizer =
            Tokenizer::from_file(model_path.join("tokenizer.json")).map_err(|e| load_err(&e))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token: pad_token.to_string(),
            ..Default::default()
        }));

        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| load_err(&e))?;

        Ok(tokenizer)
    }

    fn select_device(pref: DevicePreference) -> ModelResult<Device> {
        match pref {
            DevicePreference::Auto => Ok(Self::try_gpu().unwrap_or_else(|| {
                info!("Using CPU");
                Device::Cpu
            })),
            DevicePreference::Gpu => Self::try_gpu().ok_or_else(|| ModelError::DeviceNotAvailable {
                reason: gpu_not_available_reason(),
            }),
            DevicePreference::Cpu => Ok(Device::Cpu),
        }
    }

    fn try_gpu() -> Option<Device> {
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Using Metal GPU");
                    return Some(device);
                }
                Err(e) => debug!("Metal not available: {}", e),
            }
        }

        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("Using CUDA GPU");
                    return Some(device);
                }
                Err(e) => debug!("CUDA not available: {}", e),
            }
        }

        debug!("No GPU backend compiled in");
        None
    }

    fn load_model(
        model_path: &Path,
        architecture: ModelArchitecture,
        device: &Device,
    ) -> ModelResult<ModelBackend> {
        let load_err = |e: candle_core::Error| {
            ModelError::model_load(model_path.display().to_string(), e.to_string())
        };

        let weights_path = model_path.join("model.safetensors");
        // SAFETY: the weights file is mmapped read-only and not modified while loaded.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device).map_err(load_err)?
        };

        let config_json = std::fs::read_to_string(model_path.join("config.json"))?;
        match architecture {
            ModelArchitecture::Bert | ModelArchitecture::Unknown => {
                let bert_config: BertConfig = serde_json::from_str(&config_json)?;
                let model = BertModel::load(vb, &bert_config).map_err(load_err)?;
                Ok(ModelBackend::Bert(model))
            }
            ModelArchitecture::Roberta => {
                let roberta_config: XLMRobertaConfig = serde_json::from_str(&config_json)?;
                let model = XLMRobertaModel::new(&roberta_config, vb).map_err(load_err)?;
                Ok(ModelBackend::Roberta(model))
            }
        }
    }

    fn failed(&self, e: impl std::fmt::Display) -> ModelError {
        ModelError::embedding_failed(&self.model_info.model_id, e.to_string())
    }

    /// Reduce `[batch, seq, hidden]` to `[batch, hidden]`.
    fn pool(&self, hidden: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        match self.model_info.pooling {
            PoolingStrategy::Cls => hidden.i((.., 0))?.contiguous(),
            PoolingStrategy::Mean | PoolingStrategy::Auto => {
                let mask = mask
                    .unsqueeze(2)?
                    .to_dtype(DType::F32)?
                    .broadcast_as(hidden.shape())?;
                let sum = hidden.broadcast_mul(&mask)?.sum(1)?;
                let count = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
                sum.broadcast_div(&count)
            }
        }
    }

    fn l2_normalize(embeddings: &Tensor) -> candle_core::Result<Tensor> {
        let norm = embeddings
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        embeddings.broadcast_div(&norm)
    }
}

fn gpu_not_available_reason() -> String {
    if cfg!(feature = "metal") {
        "Metal GPU not available on this system".to_string()
    } else if cfg!(feature = "cuda") {
        "CUDA GPU not available. Ensure NVIDIA drivers and the CUDA toolkit are installed"
            .to_string()
    } else {
        "semdex was built without GPU support (rebuild with --features metal or --features cuda)"
            .to_string()
    }
}

impl EmbeddingModel for CandleEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = {
            let tokenizer = self.tokenizer.lock().map_err(|e| self.failed(e))?;
            let inputs: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
            tokenizer
                .encode_batch(inputs, true)
                .map_err(|e| ModelError::tokenization(e.to_string()))?
        };

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let token_ids: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_ids().iter().copied())
            .collect();
        let attention_mask: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().iter().copied())
            .collect();

        let token_ids = Tensor::from_vec(token_ids, (batch_size, seq_len), &self.device)
            .map_err(|e| self.failed(e))?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, seq_len), &self.device)
            .map_err(|e| self.failed(e))?;
        let token_type_ids = token_ids.zeros_like().map_err(|e| self.failed(e))?;

        let hidden = {
            let model = self.model.lock().map_err(|e| self.failed(e))?;
            model
                .forward(&token_ids, &token_type_ids, &attention_mask)
                .map_err(|e| self.failed(format!("forward failed: {e}")))?
        };

        let pooled = self
            .pool(&hidden, &attention_mask)
            .map_err(|e| self.failed(e))?;
        let normalized = Self::l2_normalize(&pooled).map_err(|e| self.failed(e))?;

        normalized.to_vec2::<f32>().map_err(|e| self.failed(e))
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }

    fn max_sequence_length(&self) -> usize {
        self.model_info.max_seq_len
    }

    fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }
}
