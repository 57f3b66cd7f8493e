//! Search behavior over real on-disk indexes.
//!
//! Every test builds a fresh project in a temp dir, runs a full reindex with
//! the deterministic `FixtureEmbedder`, then searches.

mod common;

use std::fs;

use common::{at_similarity, axis, doc_with_tokens, manager, write_file, FixtureEmbedder};
use semdex_core::{ErrorKind, SearchConfig, SearchOptions};
use tempfile::TempDir;

const QUERY: &str = "how to handle API authentication";

fn embedder() -> FixtureEmbedder {
    FixtureEmbedder::new().with_text(QUERY, axis(0))
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_threshold_drops_unrelated_document() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(
        root,
        "docs/auth.md",
        &doc_with_tokens("API authentication flow", "AUTH-FLOW", 500),
    );
    write_file(
        root,
        "docs/colors.md",
        &doc_with_tokens("color palette guidelines", "PALETTE", 300),
    );

    let manager = manager(
        root,
        embedder()
            .with_keyword("AUTH-FLOW", vec![0.82, 0.57236, 0.0, 0.0])
            .with_keyword("PALETTE", vec![0.30, 0.0, 0.95394, 0.0]),
    );
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");

    assert_eq!(results.paths(), vec!["docs/auth.md"]);
    let hit = &results.results[0];
    assert!((hit.similarity - 0.82).abs() < 1e-3, "similarity {}", hit.similarity);
    assert_eq!(hit.token_count, 500);
    assert_eq!(hit.description, "API authentication flow");
    assert!(hit.full_resource_context.is_none());
}

#[test]
fn test_search_before_reindex_is_index_not_found() {
    let temp = TempDir::new().expect("create temp dir");
    let manager = manager(temp.path(), embedder());

    let err = manager
        .search("docs", QUERY, SearchOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IndexNotFound);
    assert_eq!(err.kind().as_str(), "index_not_found");

    let err = manager
        .search("nope", QUERY, SearchOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownIndex);
}

// ============================================================================
// Ranking invariants
// ============================================================================

#[test]
fn test_results_are_thresholded_and_ordered() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    let sims = [("a", 0.75), ("b", 0.95), ("c", 0.5), ("d", 0.71), ("e", 0.9)];

    let mut embedder = embedder();
    for (name, sim) in sims {
        let marker = format!("MARK-{name}");
        write_file(root, &format!("docs/{name}.md"), &doc_with_tokens(name, &marker, 10));
        embedder = embedder.with_keyword(&marker, at_similarity(sim));
    }
    let manager = manager(root, embedder);
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");

    assert_eq!(
        results.paths(),
        vec!["docs/b.md", "docs/e.md", "docs/a.md", "docs/d.md"]
    );
    assert!(results.iter().all(|r| r.similarity >= 0.7));
    assert!(results
        .results
        .windows(2)
        .all(|w| w[0].similarity >= w[1].similarity));
}

#[test]
fn test_equal_similarity_breaks_ties_by_path() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    for name in ["zeta", "alpha", "mid"] {
        write_file(root, &format!("docs/{name}.md"), "SAME-TOPIC\n");
    }
    let manager = manager(
        root,
        embedder().with_keyword("SAME-TOPIC", at_similarity(0.8)),
    );
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    assert_eq!(
        results.paths(),
        vec!["docs/alpha.md", "docs/mid.md", "docs/zeta.md"]
    );
}

#[test]
fn test_token_budget_is_enforced_after_first_result() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/first.md", &doc_with_tokens("first", "M-FIRST", 6000));
    write_file(root, "docs/second.md", &doc_with_tokens("second", "M-SECOND", 3000));
    write_file(root, "docs/third.md", &doc_with_tokens("third", "M-THIRD", 100));

    let manager = manager(
        root,
        embedder()
            .with_keyword("M-FIRST", at_similarity(0.8))
            .with_keyword("M-SECOND", at_similarity(0.78))
            .with_keyword("M-THIRD", at_similarity(0.75)),
    );
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    // 6000 + 3000 > 8000 stops the walk; third.md is not backfilled.
    assert_eq!(results.paths(), vec!["docs/first.md"]);

    let tight = manager.with_search_config(SearchConfig {
        token_budget: 10,
        ..SearchConfig::default()
    });
    let results = tight
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    assert_eq!(results.paths(), vec!["docs/first.md"]);
    let after_first: u64 = results.iter().skip(1).map(|r| r.token_count).sum();
    assert!(after_first <= 10);
}

// ============================================================================
// Full context
// ============================================================================

#[test]
fn test_full_context_only_above_threshold() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(
        root,
        "docs/close.md",
        "---\ndescription: Close match\nrelevant_files:\n  - src/auth.ts\n---\nCLOSE body\n",
    );
    write_file(root, "docs/related.md", "RELATED body\n");

    let manager = manager(
        root,
        embedder()
            .with_keyword("CLOSE", at_similarity(0.9))
            .with_keyword("RELATED", at_similarity(0.8)),
    );
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    assert_eq!(results.paths(), vec!["docs/close.md", "docs/related.md"]);
    for result in results.iter() {
        assert_eq!(result.has_full_context(), result.similarity >= 0.85);
    }
    assert_eq!(
        results.results[0].full_resource_context.as_deref(),
        Some("CLOSE body\n")
    );
    assert_eq!(results.results[0].relevant_files, vec!["src/auth.ts"]);

    let (full, metadata_only) = results.split_by_context();
    assert_eq!(full.len(), 1);
    assert_eq!(metadata_only.len(), 1);
    assert_eq!(metadata_only[0].resource_path, "docs/related.md");
}

#[test]
fn test_metadata_only_never_attaches_context() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/close.md", "CLOSE body\n");

    let manager = manager(root, embedder().with_keyword("CLOSE", at_similarity(0.99)));
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::metadata_only())
        .expect("search");
    assert_eq!(results.len(), 1);
    assert!(results.results[0].full_resource_context.is_none());
}

// ============================================================================
// Failure modes
// ============================================================================

#[test]
fn test_empty_index_returns_no_results() {
    let temp = TempDir::new().expect("create temp dir");
    fs::create_dir_all(temp.path().join("docs")).expect("create docs");
    let manager = manager(temp.path(), embedder());
    manager.reindex("docs").expect("reindex");

    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    assert!(results.is_empty());
}

#[test]
fn test_corrupt_vector_file_is_reported_and_healed_by_reindex() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "CLOSE\n");
    let manager = manager(root, embedder().with_keyword("CLOSE", at_similarity(0.9)));
    manager.reindex("docs").expect("reindex");

    fs::write(root.join(".semdex/knowledge/docs.usearch"), b"garbage").expect("corrupt");
    let err = manager
        .search("docs", QUERY, SearchOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptIndex);
    assert!(err.is_structural());

    manager.reindex("docs").expect("reindex heals");
    let results = manager
        .search("docs", QUERY, SearchOptions::default())
        .expect("search");
    assert_eq!(results.paths(), vec!["docs/a.md"]);
}

#[test]
fn test_newer_metadata_version_is_corrupt() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "hello\n");
    let manager = manager(root, embedder());
    manager.reindex("docs").expect("reindex");

    let meta_path = root.join(".semdex/knowledge/docs.meta.json");
    let mut json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&meta_path).expect("read")).expect("parse");
    json["version"] = serde_json::json!(99);
    fs::write(&meta_path, serde_json::to_string(&json).expect("serialize")).expect("write");

    let err = manager
        .search("docs", QUERY, SearchOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CorruptIndex);
}

#[test]
fn test_query_dimension_mismatch() {
    let temp = TempDir::new().expect("create temp dir");
    let root = temp.path();
    write_file(root, "docs/a.md", "hello\n");
    manager(root, embedder()).reindex("docs").expect("reindex");

    struct Wide;
    impl semdex_core::EmbeddingProvider for Wide {
        fn model_id(&self) -> &str {
            "wide"
        }
        fn dimension(&self) -> semdex_core::SemdexResult<usize> {
            Ok(16)
        }
        fn embed_batch(&self, inputs: &[String]) -> semdex_core::SemdexResult<Vec<Vec<f32>>> {
            Ok(inputs.iter().map(|_| vec![0.25; 16]).collect())
        }
    }

    let wide = semdex_core::IndexManager::new(
        root,
        common::docs_registry(),
        std::sync::Arc::new(Wide),
    );
    let err = wide
        .search("docs", QUERY, SearchOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmbeddingMismatch);
}
