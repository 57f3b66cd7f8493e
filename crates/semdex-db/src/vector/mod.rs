//! Vector index module for semdex-db.
//!
//! ## Usage
//!
//! ```ignore
//! use semdex_db::vector::{HnswConfig, HnswVectorIndex, VectorId, VectorIndexBackend};
//!
//! let mut index = HnswVectorIndex::new(HnswConfig::new(768))?;
//! index.add(VectorId(1), &embedding)?;
//! let hits = index.search(&query, 50)?;
//! index.save(&path)?;
//! ```

mod config;
mod hnsw;
mod traits;

pub use config::{
    HnswConfig, DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD, DEFAULT_EXPANSION_SEARCH,
};
pub use hnsw::HnswVectorIndex;
pub use traits::{VectorId, VectorIndexBackend, VectorMatch};
