use super::*;

fn record(id: u64, value: &str, vector: [f32; 3]) -> VectorRecord {
    VectorRecord {
        id,
        value: value.to_string(),
        vector: vector.to_vec(),
        product_id: None,
    }
}

fn tagged(id: u64, vector: [f32; 3], product_id: Option<i64>) -> VectorRecord {
    VectorRecord {
        product_id,
        ..record(id, &format!("record {id}"), vector)
    }
}

fn no_filter(top_k: usize) -> SearchOptions {
    SearchOptions {
        top_k,
        filter: None,
        include_vectors: false,
    }
}

#[test]
fn cosine_distance_basics() {
    assert!(cosine_distance(&[1.0, 0.0], &[1.0, 0.0]).abs() < 1e-6);
    assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
    assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
    // Magnitude does not matter
    assert!(cosine_distance(&[2.0, 2.0], &[5.0, 5.0]).abs() < 1e-6);
    // Zero vectors never look similar
    assert!((cosine_distance(&[0.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
}

#[test]
fn ensure_collection_is_idempotent() {
    let mut store = VectorStore::new();
    store
        .ensure_collection("facts", 3)
        .expect("should create collection")
        .upsert(record(0, "alpha", [1.0, 0.0, 0.0]))
        .expect("should upsert");

    let collection = store
        .ensure_collection("facts", 3)
        .expect("existing collection is returned");
    assert_eq!(collection.len(), 1);
    assert_eq!(collection.name(), "facts");
    assert!(store.collection("facts").is_some());
}

#[test]
fn ensure_collection_rejects_dimension_change() {
    let mut store = VectorStore::new();
    store.ensure_collection("facts", 3).expect("should create");

    let result = store.ensure_collection("facts", 4);
    assert!(matches!(result, Err(RagError::InvariantViolation(_))));
    assert_eq!(store.collection("facts").map(Collection::dimension), Some(3));
}

#[test]
fn upsert_replaces_by_id() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "alpha", [1.0, 0.0, 0.0]))
        .expect("should insert");
    collection
        .upsert(record(0, "beta", [0.0, 1.0, 0.0]))
        .expect("should replace");

    assert_eq!(collection.len(), 1);
    let stored = collection.get(0).expect("record exists");
    assert_eq!(stored.value, "beta");
    assert_eq!(stored.vector, vec![0.0, 1.0, 0.0]);
}

#[test]
fn upsert_same_record_twice_is_a_no_op() {
    let mut collection = Collection::new("facts", 3);
    let alpha = record(0, "alpha", [1.0, 0.0, 0.0]);
    collection.upsert(alpha.clone()).expect("should insert");
    collection
        .upsert(record(1, "beta", [0.0, 1.0, 0.0]))
        .expect("should insert");

    let before = collection.search(&[1.0, 1.0, 0.0], &no_filter(10));
    collection.upsert(alpha.clone()).expect("should upsert again");
    let after = collection.search(&[1.0, 1.0, 0.0], &no_filter(10));

    assert_eq!(collection.len(), 2);
    assert_eq!(collection.get(0), Some(&alpha));
    assert_eq!(
        before.expect("search before"),
        after.expect("search after")
    );
}

#[test]
fn upsert_rejects_wrong_dimension() {
    let mut collection = Collection::new("facts", 3);
    let result = collection.upsert(VectorRecord {
        id: 0,
        value: "short".to_string(),
        vector: vec![1.0, 0.0],
        product_id: None,
    });

    assert!(matches!(result, Err(RagError::InvariantViolation(_))));
    assert!(collection.is_empty());
}

#[test]
fn upsert_rejects_non_finite_components() {
    let mut collection = Collection::new("facts", 3);
    for vector in [
        [f32::INFINITY, 0.0, 0.0],
        [0.0, f32::NEG_INFINITY, 0.0],
        [0.0, 0.0, f32::NAN],
    ] {
        let result = collection.upsert(record(0, "broken", vector));
        assert!(matches!(result, Err(RagError::InvariantViolation(_))));
    }
    assert!(collection.is_empty());

    // An embedding value beyond f32 range decodes to infinity
    let decoded: Vec<f32> = serde_json::from_str("[1e39, 0.0, 0.0]").expect("valid json");
    let result = collection.upsert(VectorRecord {
        id: 0,
        value: "overflow".to_string(),
        vector: decoded,
        product_id: None,
    });
    assert!(matches!(result, Err(RagError::InvariantViolation(_))));
    assert!(collection.is_empty());
}

#[test]
fn search_rejects_non_finite_query() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "alpha", [1.0, 0.0, 0.0]))
        .expect("should insert");

    for query in [[f32::NAN, 0.0, 0.0], [1.0, f32::INFINITY, 0.0]] {
        let result = collection.search(&query, &no_filter(5));
        assert!(matches!(result, Err(RagError::InvariantViolation(_))));
    }
}

#[test]
fn huge_finite_components_still_rank() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "huge", [f32::MAX, 0.0, 0.0]))
        .expect("insert");
    collection
        .upsert(record(1, "closer", [1.0, 0.2, 0.0]))
        .expect("insert");
    collection
        .upsert(record(2, "far", [0.0, 0.0, 1.0]))
        .expect("insert");

    let results = collection
        .search(&[1.0, 0.3, 0.0], &no_filter(3))
        .expect("search");
    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 0, 2]);
    assert!(results.iter().all(|r| r.distance.is_finite()));
}

#[test]
fn large_collection_orders_consistently() {
    let mut collection = Collection::new("facts", 3);
    for id in 0..200_u64 {
        let x = (id % 17) as f32;
        let vector = if id % 7 == 0 {
            [f32::MAX, x, 0.0]
        } else {
            [1.0, x, (id % 5) as f32]
        };
        collection
            .upsert(record(id, "value", vector))
            .expect("insert");
    }

    let results = collection
        .search(&[1.0, 2.0, 0.5], &no_filter(200))
        .expect("search");
    assert_eq!(results.len(), 200);
    assert!(results.windows(2).all(|w| {
        w[0].distance < w[1].distance || (w[0].distance == w[1].distance && w[0].id < w[1].id)
    }));
}

#[test]
fn search_rejects_wrong_query_dimension() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "alpha", [1.0, 0.0, 0.0]))
        .expect("should insert");

    let result = collection.search(&[1.0, 0.0], &no_filter(5));
    assert!(matches!(result, Err(RagError::InvariantViolation(_))));
}

#[test]
fn search_empty_collection() {
    let collection = Collection::new("facts", 3);
    let results = collection
        .search(&[1.0, 0.0, 0.0], &no_filter(5))
        .expect("empty search is not an error");
    assert!(results.is_empty());
}

#[test]
fn search_orders_by_distance() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "far", [0.0, 0.0, 1.0]))
        .expect("insert");
    collection
        .upsert(record(1, "near", [1.0, 0.1, 0.0]))
        .expect("insert");
    collection
        .upsert(record(2, "middle", [1.0, 1.0, 0.0]))
        .expect("insert");

    let results = collection
        .search(&[1.0, 0.0, 0.0], &no_filter(5))
        .expect("search");

    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 0]);
    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
    for result in &results {
        assert!((result.similarity - (1.0 - result.distance)).abs() < 1e-6);
    }
}

#[test]
fn search_respects_top_k() {
    let mut collection = Collection::new("facts", 3);
    for id in 0..10 {
        collection
            .upsert(record(id, "value", [1.0, id as f32, 0.5]))
            .expect("insert");
    }

    for top_k in [0, 1, 3, 10, 25] {
        let results = collection
            .search(&[1.0, 0.0, 0.0], &no_filter(top_k))
            .expect("search");
        assert_eq!(results.len(), top_k.min(10));
    }
}

#[test]
fn equal_distances_break_ties_by_id() {
    let mut collection = Collection::new("facts", 3);
    for id in [7, 3, 5, 1] {
        collection
            .upsert(record(id, "same", [0.0, 1.0, 0.0]))
            .expect("insert");
    }

    let results = collection
        .search(&[0.0, 1.0, 0.0], &no_filter(4))
        .expect("search");
    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3, 5, 7]);
}

#[test]
fn filter_on_product_id() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(tagged(0, [1.0, 0.0, 0.0], Some(42)))
        .expect("insert");
    collection
        .upsert(tagged(1, [1.0, 0.0, 0.0], None))
        .expect("insert");
    collection
        .upsert(tagged(2, [0.9, 0.1, 0.0], Some(42)))
        .expect("insert");
    collection
        .upsert(tagged(3, [1.0, 0.0, 0.0], Some(7)))
        .expect("insert");

    let options = SearchOptions {
        top_k: 10,
        filter: Some(Filter::ProductIdEquals(Some(42))),
        include_vectors: false,
    };
    let results = collection.search(&[1.0, 0.0, 0.0], &options).expect("search");
    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert!(results.iter().all(|r| r.product_id == Some(42)));
}

#[test]
fn null_filter_matches_only_untagged_records() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(tagged(0, [1.0, 0.0, 0.0], Some(42)))
        .expect("insert");
    collection
        .upsert(tagged(1, [0.0, 1.0, 0.0], None))
        .expect("insert");

    let options = SearchOptions {
        top_k: 10,
        filter: Some(Filter::ProductIdEquals(None)),
        include_vectors: false,
    };
    let results = collection.search(&[1.0, 0.0, 0.0], &options).expect("search");
    let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1]);

    let unfiltered = collection
        .search(&[1.0, 0.0, 0.0], &no_filter(10))
        .expect("search");
    assert_eq!(unfiltered.len(), 2);
}

#[test]
fn vectors_only_when_requested() {
    let mut collection = Collection::new("facts", 3);
    collection
        .upsert(record(0, "alpha", [1.0, 0.0, 0.0]))
        .expect("insert");

    let without = collection
        .search(&[1.0, 0.0, 0.0], &no_filter(1))
        .expect("search");
    assert_eq!(without[0].vector, None);

    let with = collection
        .search(
            &[1.0, 0.0, 0.0],
            &SearchOptions {
                include_vectors: true,
                ..no_filter(1)
            },
        )
        .expect("search");
    assert_eq!(with[0].vector, Some(vec![1.0, 0.0, 0.0]));
    assert_eq!(with[0].value, "alpha");
}
