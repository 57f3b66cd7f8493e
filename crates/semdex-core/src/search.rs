//! Ranking, filtering and budgeting of vector hits.
//!
//! Given the raw nearest-neighbour matches:
//!
//! 1. resolve each ID to its metadata, dropping IDs with none;
//! 2. `similarity = 1 - distance`, dropping anything below the threshold;
//! 3. sort by similarity descending, ties by path ascending;
//! 4. take results in order while the running token sum stays within the
//!    budget. The first result is always taken; the first one that does not
//!    fit ends the walk;
//! 5. mark results at or above the full-context threshold.

use std::fs;
use std::path::Path;

use semdex_db::{DocumentMetadata, VectorId, VectorMatch};
use tracing::{debug, warn};

use crate::config::SearchConfig;
use crate::document::parse_document;
use crate::types::{SearchOptions, SearchResult};

/// A hit that survived ranking, before its body is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedHit<'a> {
    pub meta: &'a DocumentMetadata,
    pub similarity: f32,
    pub full_context: bool,
}

/// Apply threshold, ordering, budget and full-context gating to `matches`.
pub fn rank<'a, F>(
    matches: &[VectorMatch],
    lookup: F,
    config: &SearchConfig,
    options: SearchOptions,
) -> Vec<RankedHit<'a>>
where
    F: Fn(VectorId) -> Option<&'a DocumentMetadata>,
{
    let mut candidates: Vec<(&'a DocumentMetadata, f32)> = Vec::with_capacity(matches.len());
    for m in matches {
        let Some(meta) = lookup(m.id) else {
            warn!("Vector {} has no metadata; dropping it", m.id);
            continue;
        };
        let similarity = m.similarity();
        if similarity.is_nan() || similarity < config.similarity_threshold {
            continue;
        }
        candidates.push((meta, similarity));
    }

    candidates.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.path.cmp(&b.0.path)));

    let mut hits = Vec::new();
    let mut total_tokens: u64 = 0;
    for (meta, similarity) in candidates {
        if !hits.is_empty() && total_tokens + meta.token_count > config.token_budget {
            debug!(
                "Token budget {} reached at {} ({} tokens)",
                config.token_budget, meta.path, meta.token_count
            );
            break;
        }
        total_tokens += meta.token_count;
        hits.push(RankedHit {
            meta,
            similarity,
            full_context: !options.metadata_only && similarity >= config.full_context_threshold,
        });
    }
    hits
}

/// Turn ranked hits into results, reading bodies for full-context hits.
///
/// Bodies come from the working tree at search time, so an edit made since
/// the last reindex shows up here while `token_count` stays the indexed one.
/// A full-context hit whose file can no longer be read is dropped with a
/// warning: the index is behind the tree for that path.
pub fn materialize(hits: Vec<RankedHit<'_>>, project_root: &Path) -> Vec<SearchResult> {
    hits.into_iter()
        .filter_map(|hit| {
            let full_resource_context = if hit.full_context {
                Some(read_body(project_root, &hit.meta.path)?)
            } else {
                None
            };
            Some(SearchResult {
                resource_path: hit.meta.path.clone(),
                similarity: hit.similarity,
                token_count: hit.meta.token_count,
                description: hit.meta.description.clone(),
                relevant_files: hit.meta.relevant_files.clone(),
                full_resource_context,
            })
        })
        .collect()
}

fn read_body(project_root: &Path, rel_path: &str) -> Option<String> {
    match fs::read_to_string(project_root.join(rel_path)) {
        Ok(text) => Some(parse_document(&text).body),
        Err(e) => {
            warn!("Dropping {} from results, cannot read its body: {}", rel_path, e);
            None
        }
    }
}
