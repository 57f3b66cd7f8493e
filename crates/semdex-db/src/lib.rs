//! # semdex-db
//!
//! Storage layer for semdex: the two files that make up one named index and
//! the write discipline that keeps them consistent.
//!
//! ## Architecture
//!
//! ```text
//! semdex-core (IndexManager)
//!     ├── vector::HnswVectorIndex   <name>.usearch     (binary HNSW graph)
//!     └── metadata::MetadataStore   <name>.meta.json   (id ↔ path, documents)
//! ```
//!
//! Both files are replaced with temp-then-rename (`atomic`). The vector blob
//! is always committed before the metadata, so the metadata never names an
//! ID the committed blob lacks.
//!
//! ## Modules
//!
//! - `vector`: usearch HNSW index under the cosine metric
//! - `metadata`: document metadata store with invariant checks
//! - `atomic`: temp-then-rename file replacement

pub mod atomic;
pub mod error;
pub mod metadata;
pub mod vector;

pub use error::{DbError, DbResult};
pub use metadata::{DocumentMetadata, MetadataStore, FIRST_ID, METADATA_FORMAT_VERSION};
pub use vector::{HnswConfig, HnswVectorIndex, VectorId, VectorIndexBackend, VectorMatch};
