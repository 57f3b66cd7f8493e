//! Shared test utilities for semdex-core integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use semdex_core::{EmbeddingProvider, IndexConfig, IndexManager, IndexRegistry, SemdexResult};

/// Dimension of every fixture vector.
pub const DIM: usize = 8;

/// Fixture vectors live in the first half of the space; hashed fallbacks
/// live in the second half, so unrelated text scores 0 against any fixture.
const FIXTURE_DIMS: usize = 4;

/// Deterministic embedder: exact-text table, then keyword table, then a
/// hashed fallback.
pub struct FixtureEmbedder {
    model_id: String,
    exact: Vec<(String, Vec<f32>)>,
    keywords: Vec<(String, Vec<f32>)>,
}

impl FixtureEmbedder {
    pub fn new() -> Self {
        Self {
            model_id: "fixture-embedder".to_string(),
            exact: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_model_id(mut self, model_id: &str) -> Self {
        self.model_id = model_id.to_string();
        self
    }

    /// Map inputs equal to `text` to `vector`.
    pub fn with_text(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.exact.push((text.to_string(), normalize(pad(vector))));
        self
    }

    /// Map inputs containing `keyword` to `vector`. First match wins.
    pub fn with_keyword(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.keywords.push((keyword.to_string(), normalize(pad(vector))));
        self
    }

    fn fallback(&self, text: &str) -> Vec<f32> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let mut state = hasher.finish();

        let mut v = vec![0.0; DIM];
        for slot in v.iter_mut().skip(FIXTURE_DIMS) {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = ((state >> 33) as f32 / (u32::MAX as f32 / 2.0)) - 1.0;
        }
        v[FIXTURE_DIMS] += 2.0;
        normalize(v)
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Some((_, v)) = self.exact.iter().find(|(t, _)| t == text) {
            return v.clone();
        }
        if let Some((_, v)) = self.keywords.iter().find(|(k, _)| text.contains(k.as_str())) {
            return v.clone();
        }
        self.fallback(text)
    }
}

impl EmbeddingProvider for FixtureEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> SemdexResult<usize> {
        Ok(DIM)
    }

    fn embed_batch(&self, inputs: &[String]) -> SemdexResult<Vec<Vec<f32>>> {
        Ok(inputs.iter().map(|s| self.vector_for(s)).collect())
    }
}

fn pad(mut v: Vec<f32>) -> Vec<f32> {
    v.resize(DIM, 0.0);
    v
}

fn normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Unit vector on `axis`.
pub fn axis(axis: usize) -> Vec<f32> {
    let mut v = vec![0.0; FIXTURE_DIMS];
    v[axis] = 1.0;
    v
}

/// Unit vector whose cosine similarity to `axis(0)` is `similarity`.
pub fn at_similarity(similarity: f32) -> Vec<f32> {
    vec![similarity, (1.0 - similarity * similarity).sqrt(), 0.0, 0.0]
}

// ============================================================================
// Project fixtures
// ============================================================================

pub fn docs_registry() -> IndexRegistry {
    IndexRegistry::new(vec![IndexConfig::new("docs")
        .with_description("Project documentation")
        .with_root("docs")
        .with_extension("md")
        .with_excluded_name("README.md")])
    .expect("valid registry")
}

pub fn manager(root: &Path, embedder: FixtureEmbedder) -> IndexManager {
    IndexManager::new(root, docs_registry(), Arc::new(embedder))
}

pub fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("file has a parent")).expect("create dirs");
    fs::write(path, content).expect("write file");
}

/// A markdown document whose body is exactly `tokens * 4` characters.
pub fn doc_with_tokens(description: &str, marker: &str, tokens: usize) -> String {
    let mut body = format!("{marker}\n");
    let target = tokens * 4;
    assert!(body.len() <= target, "marker longer than token target");
    body.push_str(&"z".repeat(target - body.len()));
    format!("---\ndescription: {description}\n---\n{body}")
}
