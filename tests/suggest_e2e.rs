//! End-to-end suggestion lookups against the in-memory reference backend.
//!
//! These tests exercise the whole pipeline - analysis, strategy
//! construction, position-decay scoring, assembly, highlighting, caching -
//! the way an embedding host would drive it.

use axi::index::{FieldMap, MemoryIndex};
use axi::suggest::{CacheConfig, LookupRequest, Suggester, SuggesterConfig};
use std::sync::Arc;

fn product_fields() -> FieldMap {
    FieldMap {
        normal: Some("suggest".into()),
        payload: Some("suggest".into()),
        ngram: Some("suggest_ngram".into()),
        ngram_second: Some("suggest_ngram2".into()),
        concat: Some("suggest_concat".into()),
        weight: Some("popularity".into()),
        display: Some("display".into()),
        context: Some("category".into()),
    }
}

fn product_index() -> Arc<MemoryIndex> {
    let mut builder = MemoryIndex::builder(product_fields());
    builder
        .push_with("apple ipad pro 11", Some(8.0), Some(b"tablets"))
        .push_with("apple ipad air", Some(6.0), Some(b"tablets"))
        .push_with("apple iphone 13 mini", Some(9.0), Some(b"phones"))
        .push_with("case for apple ipad", Some(2.0), Some(b"accessories"))
        .push_with("thermomix tm6 robot", Some(7.0), Some(b"kitchen"))
        .push_with("samsung galaxy tab", Some(5.0), Some(b"tablets"));
    Arc::new(builder.build().unwrap())
}

fn product_suggester() -> Suggester {
    let config = SuggesterConfig {
        name: "products".into(),
        fields: product_fields(),
        cache: Some(CacheConfig {
            capacity: 32,
            max_query_len: 4,
        }),
        ..SuggesterConfig::default()
    };
    Suggester::new(config, product_index()).unwrap()
}

#[test]
fn position_aligned_suggestions_rank_first() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("apple ipad ", 10)).unwrap();

    // Docs 0, 1 and 3 all contain both words; in doc 3 they sit two slots
    // later and decay below the aligned matches.
    assert_eq!(response.num_found, 3);
    let texts: Vec<&str> = response
        .suggestions
        .iter()
        .map(|sg| sg.text.as_str())
        .collect();
    assert_eq!(texts.last().copied(), Some("case for apple ipad"));
    assert!(texts[0].starts_with("apple ipad"));
}

#[test]
fn prefix_token_completes_through_ngrams() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("thermom", 10)).unwrap();
    assert_eq!(response.num_found, 1);
    assert_eq!(response.suggestions[0].text, "thermomix tm6 robot");
    assert_eq!(
        response.suggestions[0].highlight.as_deref(),
        Some("[thermom]ix tm6 robot")
    );
}

#[test]
fn typo_recovery_through_fuzzy_expansion() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("aplle ipad ", 10)).unwrap();
    assert!(response.num_found >= 2);
    assert!(response.suggestions[0].text.starts_with("apple ipad"));
}

#[test]
fn missing_space_recovery_through_cut_words() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("appleipad", 10)).unwrap();
    assert!(response.num_found > 0);
    assert!(response.suggestions[0].text.contains("apple ipad"));
}

#[test]
fn highlighting_marks_matched_and_prefix_parts() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("apple ipa", 10)).unwrap();
    let top = &response.suggestions[0];
    assert!(
        top.highlight
            .as_deref()
            .is_some_and(|h| h.starts_with("[apple] [ipa]d"))
    );
}

#[test]
fn context_filter_restricts_to_label() {
    let s = product_suggester();
    let request = LookupRequest {
        context_filter: Some("phones".into()),
        ..LookupRequest::new("apple", 10)
    };
    let response = s.lookup(&request).unwrap();
    assert_eq!(response.num_found, 1);
    assert_eq!(response.suggestions[0].text, "apple iphone 13 mini");
}

#[test]
fn contexts_attach_to_first_hit_only_by_default() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("apple ipad ", 10)).unwrap();
    assert!(!response.suggestions[0].contexts.is_empty());
    for suggestion in &response.suggestions[1..] {
        assert!(suggestion.contexts.is_empty());
    }
}

#[test]
fn weight_field_breaks_near_ties() {
    let s = product_suggester();
    // Both ipad docs match "apple ipad" in the same slots; the stored
    // popularity weight (8.0 vs 6.0) decides the order.
    let response = s.lookup(&LookupRequest::new("apple ipad ", 2)).unwrap();
    assert_eq!(response.suggestions[0].text, "apple ipad pro 11");
    assert_eq!(response.suggestions[1].text, "apple ipad air");
}

#[test]
fn long_query_degrades_to_flat_matching() {
    let mut builder = MemoryIndex::builder(product_fields());
    builder.push_with(
        "one two three four five six seven eight",
        Some(1.0),
        Some(b"misc"),
    );
    let config = SuggesterConfig {
        name: "long".into(),
        fields: product_fields(),
        ..SuggesterConfig::default()
    };
    let s = Suggester::new(config, Arc::new(builder.build().unwrap())).unwrap();

    let response = s
        .lookup(&LookupRequest::new("one two three four five six seven ", 10))
        .unwrap();
    assert_eq!(response.num_found, 1);
}

#[test]
fn all_terms_required_false_widens_results() {
    let s = product_suggester();
    let request = LookupRequest {
        all_terms_required: Some(false),
        ..LookupRequest::new("apple galaxy ", 10)
    };
    let response = s.lookup(&request).unwrap();
    // Union of apple docs and the galaxy doc.
    assert_eq!(response.num_found, 5);

    let strict = s.lookup(&LookupRequest::new("apple galaxy ", 10)).unwrap();
    assert_eq!(strict.num_found, 0);
}

#[test]
fn repeated_lookup_is_served_from_cache_until_snapshot_swap() {
    let s = product_suggester();
    let request = LookupRequest::new("ipad", 10);

    let first = s.lookup(&request).unwrap();
    let cached = s.lookup(&request).unwrap();
    assert_eq!(first, cached);

    let mut builder = MemoryIndex::builder(product_fields());
    builder.push_with("ipad mini 6", Some(1.0), Some(b"tablets"));
    s.update_snapshot(Arc::new(builder.build().unwrap()));

    let refreshed = s.lookup(&request).unwrap();
    assert_eq!(refreshed.num_found, 1);
    assert_eq!(refreshed.suggestions[0].text, "ipad mini 6");
}

#[test]
fn scores_are_fixed_point_millionths() {
    let s = product_suggester();
    let response = s.lookup(&LookupRequest::new("thermomix tm6 ", 10)).unwrap();
    assert_eq!(response.num_found, 1);
    // Two exact positional matches (15 + 10) plus the weighted popularity
    // signal (7.0), in millionths.
    assert_eq!(response.suggestions[0].score, 32_000_000);
}

#[test]
fn concurrent_lookups_share_one_suggester() {
    let s = Arc::new(product_suggester());
    let mut handles = Vec::new();
    for query in ["apple", "ipad", "thermom", "galaxy tab", "aplle"] {
        let s = Arc::clone(&s);
        let query = query.to_string();
        handles.push(std::thread::spawn(move || {
            for _ in 0..20 {
                s.lookup(&LookupRequest::new(query.clone(), 5)).unwrap();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn accented_queries_match_folded_index_terms() {
    let mut builder = MemoryIndex::builder(product_fields());
    builder.push_with("télévision samsung", Some(1.0), Some(b"tv"));
    let config = SuggesterConfig {
        name: "tv".into(),
        fields: product_fields(),
        ..SuggesterConfig::default()
    };
    let s = Suggester::new(config, Arc::new(builder.build().unwrap())).unwrap();

    let response = s.lookup(&LookupRequest::new("television ", 10)).unwrap();
    assert_eq!(response.num_found, 1);
    assert_eq!(
        response.suggestions[0].highlight.as_deref(),
        Some("[télévision] samsung")
    );
}
