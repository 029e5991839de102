//! End-to-end tests for the hybrid retrieval pipeline
//!
//! Exercises the public facade: index nodes through the service, query with
//! and without embeddings, and verify fusion, fallback, enrichment, and the
//! exact/HNSW index choice.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use skald::{
    CancelToken, DocId, Error, HnswConfig, IndexKind, MemoryEngine, Node, SearchOptions,
    SearchService, METHOD_FULLTEXT, METHOD_RRF_HYBRID, METHOD_VECTOR,
};
use std::sync::Arc;

fn doc(id: &str, content: &str, embedding: Option<Vec<f32>>) -> Node {
    let mut node = Node::new(id)
        .with_label("Document")
        .with_property("content", content);
    if let Some(e) = embedding {
        node = node.with_embedding(e);
    }
    node
}

fn build_service(kind: IndexKind, dimension: usize, nodes: Vec<Node>) -> SearchService {
    let storage = Arc::new(MemoryEngine::new());
    for node in nodes {
        storage.put_node(node);
    }
    let service = SearchService::with_index_kind(storage, dimension, kind);
    service.build_indexes(&CancelToken::new()).unwrap();
    service
}

#[test]
fn vector_search_respects_similarity_floor() {
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![
            doc("d1", "", Some(vec![1.0, 0.0, 0.0, 0.0])),
            doc("d2", "", Some(vec![0.9, 0.1, 0.0, 0.0])),
            doc("d3", "", Some(vec![0.0, 1.0, 0.0, 0.0])),
        ],
    );

    let response = service
        .search(
            &CancelToken::new(),
            "",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    // Lexical index is empty, so the vector ranking decides everything;
    // d3 is orthogonal and must stay below the 0.5 floor
    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["d1", "d2"]);
    assert!((response.results[0].similarity - 1.0).abs() < 1e-5);
    assert!(response.results[1].similarity > 0.9 && response.results[1].similarity < 1.0);
}

#[test]
fn text_only_query_is_not_a_fallback() {
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![
            doc("d1", "machine learning deep neural networks", None),
            doc("d3", "database systems and query optimization", None),
        ],
    );

    let response = service
        .search(&CancelToken::new(), "database query", None, &SearchOptions::default())
        .unwrap();

    assert_eq!(response.search_method, METHOD_FULLTEXT);
    assert!(!response.fallback_triggered);
    assert_eq!(response.results[0].id.as_str(), "d3");
}

#[test]
fn hybrid_fusion_rewards_presence_in_both_rankings() {
    // d2 is second-best by vector but the only strong lexical match for the
    // query; appearing in both lists must put it first after fusion
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![
            doc("d1", "unrelated content here", Some(vec![1.0, 0.0, 0.0, 0.0])),
            doc(
                "d2",
                "reciprocal rank fusion explained",
                Some(vec![0.95, 0.05, 0.0, 0.0]),
            ),
        ],
    );

    let opts = SearchOptions::default().with_weights(1.0, 1.0);
    let response = service
        .search(
            &CancelToken::new(),
            "fusion",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &opts,
        )
        .unwrap();

    assert_eq!(response.search_method, METHOD_RRF_HYBRID);
    assert_eq!(response.results[0].id.as_str(), "d2");
    assert_eq!(response.results[0].vector_rank, Some(2));
    assert_eq!(response.results[0].lexical_rank, Some(1));
    assert_eq!(response.results[1].id.as_str(), "d1");
    assert_eq!(response.results[1].lexical_rank, None);

    let metrics = response.metrics.unwrap();
    assert_eq!(metrics.vector_candidates, 2);
    assert_eq!(metrics.lexical_candidates, 1);
    assert_eq!(metrics.fused_candidates, 2);
}

#[test]
fn fallback_chain_ends_at_fulltext() {
    // Embedding matches nothing above threshold and the long query drops
    // the lexical weight low enough that fusion is empty too; the lexical
    // match must still come back, flagged as a fallback, never silently
    // empty
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![doc(
            "d1",
            "kubernetes deployment guide",
            Some(vec![1.0, 0.0, 0.0, 0.0]),
        )],
    );

    let response = service
        .search(
            &CancelToken::new(),
            "kubernetes deployment guide for the production cluster",
            Some(&[0.0, 0.0, 0.0, 1.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    assert_eq!(response.search_method, METHOD_FULLTEXT);
    assert!(response.fallback_triggered);
    assert!(!response.message.is_empty());
    assert_eq!(response.results[0].id.as_str(), "d1");
}

#[test]
fn fallback_to_vector_only_when_fusion_is_empty() {
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![doc("d1", "nothing lexical matches", Some(vec![1.0, 0.0, 0.0, 0.0]))],
    );

    // Two-word query drops the vector weight to 0.5, so a lone vector hit
    // scores 0.5/61 < 0.01 and fusion comes up empty
    let response = service
        .search(
            &CancelToken::new(),
            "zzz qqq",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    assert_eq!(response.search_method, METHOD_VECTOR);
    assert!(response.fallback_triggered);
    assert_eq!(response.results[0].id.as_str(), "d1");
}

#[test]
fn dimension_mismatch_is_a_hard_error() {
    let service = build_service(IndexKind::Exact, 4, vec![]);
    let err = service
        .search(
            &CancelToken::new(),
            "query",
            Some(&[1.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::DimensionMismatch {
            expected: 4,
            actual: 2
        }
    ));
}

#[test]
fn cancellation_aborts_the_query() {
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![doc("d1", "text", Some(vec![1.0, 0.0, 0.0, 0.0]))],
    );

    let cancel = CancelToken::new();
    cancel.cancel();
    let err = service
        .search(
            &cancel,
            "text",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}

#[test]
fn hnsw_service_matches_exact_top_result() {
    let mut rng = StdRng::seed_from_u64(7);
    let nodes: Vec<Node> = (0..100)
        .map(|i| {
            let v: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();
            doc(&format!("d{i}"), "", Some(v))
        })
        .collect();

    let exact = build_service(IndexKind::Exact, 8, nodes.clone());
    let hnsw = build_service(IndexKind::Hnsw(HnswConfig::default()), 8, nodes);

    let opts = SearchOptions {
        min_similarity: -1.0,
        limit: 5,
        ..Default::default()
    };
    for _ in 0..10 {
        let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let exact_top = exact
            .search(&CancelToken::new(), "", Some(&query), &opts)
            .unwrap();
        let hnsw_top = hnsw
            .search(&CancelToken::new(), "", Some(&query), &opts)
            .unwrap();

        // With ef_search covering the whole corpus the approximate index
        // should agree with brute force on the nearest neighbor
        assert_eq!(
            exact_top.results[0].id.as_str(),
            hnsw_top.results[0].id.as_str()
        );
    }
}

#[test]
fn removal_updates_search_results() {
    let service = build_service(
        IndexKind::Hnsw(HnswConfig::default()),
        4,
        vec![
            doc("keep", "persistent entry", Some(vec![1.0, 0.0, 0.0, 0.0])),
            doc("drop", "persistent entry", Some(vec![0.99, 0.01, 0.0, 0.0])),
        ],
    );

    service.remove_node(&DocId::from("drop"));

    let response = service
        .search(
            &CancelToken::new(),
            "persistent",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["keep"]);
}

#[test]
fn enrichment_truncates_long_content() {
    let long_content = format!("searchable {}", "z".repeat(400));
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![doc("d1", &long_content, Some(vec![1.0, 0.0, 0.0, 0.0]))],
    );

    let response = service
        .search(
            &CancelToken::new(),
            "searchable",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    let preview = &response.results[0].content_preview;
    assert_eq!(preview.chars().count(), 203);
    assert!(preview.ends_with("..."));
    assert_eq!(response.results[0].labels, vec!["Document"]);
}

#[test]
fn response_serializes_cleanly() {
    let service = build_service(
        IndexKind::Exact,
        4,
        vec![doc("d1", "serialization check", Some(vec![1.0, 0.0, 0.0, 0.0]))],
    );

    let response = service
        .search(
            &CancelToken::new(),
            "serialization",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &SearchOptions::default(),
        )
        .unwrap();

    let json: serde_json::Value = serde_json::to_value(&response).unwrap();
    assert_eq!(json["status"], "success");
    assert_eq!(json["search_method"], "rrf_hybrid");
    assert_eq!(json["returned"], 1);
    assert!(json["results"][0]["score"].as_f64().unwrap() > 0.0);
    // Absent optional ranks must not appear in the output
    assert!(json["results"][0].get("lexical_rank").is_some());
}

#[test]
fn limit_truncates_results() {
    let nodes: Vec<Node> = (0..30)
        .map(|i| {
            doc(
                &format!("d{i:02}"),
                "repeated corpus text",
                Some(vec![1.0, i as f32 * 0.001, 0.0, 0.0]),
            )
        })
        .collect();
    let service = build_service(IndexKind::Exact, 4, nodes);

    let opts = SearchOptions::default().with_limit(7);
    let response = service
        .search(
            &CancelToken::new(),
            "corpus",
            Some(&[1.0, 0.0, 0.0, 0.0]),
            &opts,
        )
        .unwrap();

    assert_eq!(response.returned, 7);
    assert_eq!(response.results.len(), 7);
    assert!(response.total_candidates >= 7);
}
