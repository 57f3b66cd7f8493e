//! # semdex-core
//!
//! Semantic document index engine.
//!
//! This crate answers natural-language questions over curated knowledge bases
//! (project docs, a roadmap corpus) with documents ranked by embedding
//! similarity and capped by a token budget. It is consumed by a CLI layer that
//! lives outside this workspace.
//!
//! ## Main Types
//!
//! - [`IndexManager`] – entry point for search, reindex and inspection
//! - [`IndexRegistry`] / [`IndexConfig`] – the immutable table of knowledge bases
//! - [`EmbeddingProvider`] – the embedding seam; [`LazyEmbeddingProvider`] wraps
//!   the Candle model from `semdex-model`
//! - [`SemdexError`] – domain error type, classified by [`ErrorKind`]
//!
//! ## Modules
//!
//! - [`config`] – index registry and engine config (`.semdex/config.yaml`)
//! - [`document`] – front matter parsing and token estimates
//! - [`references`] – file reference extraction and validation
//! - [`discovery`] – `.gitignore`-aware document discovery
//! - [`store`] – the persisted vector + metadata pair of one index
//! - [`lock`] – advisory per-index writer lock
//! - [`search`] – ranking, threshold, budget and full-context gating
//! - [`reindex`] – full and incremental reindex
//!
//! ## Example
//!
//! ```ignore
//! use semdex_core::{EngineConfig, FileChange, IndexManager, IndexRegistry, SearchOptions};
//! use std::path::Path;
//!
//! let root = Path::new(".");
//! let config = EngineConfig::load_or_default(root)?;
//! let manager = IndexManager::from_config(root, IndexRegistry::builtin(), config)?;
//!
//! manager.reindex_all(None)?;
//! let outcome = manager.reindex_from_changes("docs", &[FileChange::added("docs/new.md")])?;
//! if !outcome.success() {
//!     for rejected in &outcome.missing_references {
//!         eprintln!("{}: missing {:?}", rejected.doc_path, rejected.missing_files);
//!     }
//! }
//!
//! let results = manager.search("docs", "how to handle API authentication", SearchOptions::default())?;
//! let (full_context, metadata_only) = results.split_by_context();
//! ```

// Modules
pub mod config;
pub mod constants;
pub mod db_adapter;
pub mod discovery;
pub mod document;
pub mod embedding;
pub mod errors;
pub mod lock;
mod manager;
pub mod model_adapter;
pub mod references;
pub mod reindex;
pub mod search;
pub mod store;
pub mod types;

// Re-exports for convenience
pub use config::{
    EngineConfig, IndexConfig, IndexRegistry, PerformanceConfig, SearchConfig,
    DEFAULT_FULL_CONTEXT_THRESHOLD, DEFAULT_SEARCH_K, DEFAULT_SIMILARITY_THRESHOLD,
    DEFAULT_TOKEN_BUDGET,
};
pub use document::{parse_document, DocumentFrontMatter, ParsedDocument};
pub use embedding::{EmbeddingProvider, LazyEmbeddingProvider};
pub use errors::{ErrorKind, SemdexError, SemdexResult};
pub use manager::IndexManager;
pub use references::{extract_references, ReferenceReport};
pub use types::{
    ChangeKind, FileChange, FullReindexResult, IncrementalReindexResult, IndexStatus,
    MissingReference, SearchOptions, SearchResult, SearchResults, SkippedDocument,
};

// Storage and model types that appear in this crate's API
pub use semdex_db::DocumentMetadata;
pub use semdex_model::EmbeddingConfig;
