//! Runtime resolution of embedding model directories.
//!
//! Models are disk assets installed next to the tool, never downloaded at
//! runtime.
//!
//! # Search Order
//!
//! 1. **Environment override**: `$SEMDEX_MODELS_DIR`
//! 2. **User directory**: `~/.semdex/models`
//! 3. **Binary-relative**: `{exe_dir}/models`
//!
//! # Model Layout
//!
//! ```text
//! {models_dir}/
//!   embeddings/
//!     bge-base-en-v1.5/
//!       config.json
//!       model.safetensors
//!       tokenizer.json
//! ```
//!
//! A flat layout (`{models_dir}/bge-base-en-v1.5`) and the Hugging Face style
//! (`{models_dir}/BAAI/bge-base-en-v1.5`) are accepted as well.

use std::env;
use std::path::{Path, PathBuf};

use crate::error::{ModelError, ModelResult};

/// Environment variable for overriding the models directory.
pub const SEMDEX_MODELS_DIR_ENV: &str = "SEMDEX_MODELS_DIR";

/// Subdirectory holding embedding models.
pub const EMBEDDINGS_SUBDIR: &str = "embeddings";

/// Required files for a valid model directory.
pub const REQUIRED_MODEL_FILES: &[&str] = &["config.json", "model.safetensors", "tokenizer.json"];

/// Locates model directories using the search order above.
#[derive(Debug, Clone, Default)]
pub struct ModelLocator {
    base_dir: Option<PathBuf>,
}

impl ModelLocator {
    /// Create a locator that walks the default search order.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a locator pinned to a single base directory.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Candidate base directories, in search order.
    pub fn search_paths(&self) -> Vec<PathBuf> {
        if let Some(ref base) = self.base_dir {
            return vec![base.clone()];
        }

        let mut paths = Vec::new();
        if let Ok(env_path) = env::var(SEMDEX_MODELS_DIR_ENV) {
            if !env_path.is_empty() {
                paths.push(PathBuf::from(env_path));
            }
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".semdex").join("models"));
        }
        if let Ok(exe_path) = env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                paths.push(exe_dir.join("models"));
            }
        }
        paths
    }

    /// Resolve the first existing base models directory.
    pub fn resolve_base_dir(&self) -> ModelResult<PathBuf> {
        let searched = self.search_paths();
        searched
            .iter()
            .find(|p| p.is_dir())
            .cloned()
            .ok_or(ModelError::ModelsDirectoryNotFound { searched })
    }

    /// Resolve the directory of an embedding model.
    ///
    /// `model_id` may be a full Hugging Face ID (`BAAI/bge-base-en-v1.5`) or
    /// its short name (`bge-base-en-v1.5`).
    pub fn embedding_model_path(&self, model_id: &str) -> ModelResult<PathBuf> {
        let base = self.resolve_base_dir()?;
        let model_name = short_model_name(model_id);

        let candidates = [
            base.join(EMBEDDINGS_SUBDIR).join(model_name),
            base.join(model_id),
            base.join(model_name),
        ];

        candidates
            .iter()
            .find(|p| p.join("config.json").is_file())
            .cloned()
            .ok_or_else(|| ModelError::ModelNotFound {
                model_id: model_id.to_string(),
                path: candidates[0].clone(),
            })
    }

    /// Check that a model directory holds every required file.
    pub fn validate_model_dir(&self, path: &Path) -> ModelResult<()> {
        if !path.is_dir() {
            return Err(ModelError::ModelNotFound {
                model_id: path.display().to_string(),
                path: path.to_path_buf(),
            });
        }

        let missing: Vec<&'static str> = REQUIRED_MODEL_FILES
            .iter()
            .copied()
            .filter(|file| !path.join(file).exists())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ModelError::IncompleteModelFiles {
                path: path.to_path_buf(),
                missing,
            })
        }
    }
}

/// "BAAI/bge-base-en-v1.5" → "bge-base-en-v1.5"
pub(crate) fn short_model_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}
