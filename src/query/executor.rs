//! Compound query evaluation.
//!
//! Walks each token slot's strategies against an index snapshot, keeps the
//! best strategy score per document (dis-max), combines slots under the
//! configured clause requirement and returns the top-K documents.

use crate::analysis::position::decode_position;
use crate::index::snapshot::Snapshot;
use crate::index::types::{DocId, Hit};
use crate::query::builder::{CompoundQuery, Occur, StrategySlot, TermStrategy};
use crate::query::scorer::{
    CoefficientTable, PayloadAccumulator, combine_doc_score, fuzzy_term_boost,
};
use ahash::AHashMap;
use anyhow::Result;
use roaring::RoaringBitmap;

/// Divisor applied to the collection doc count before it feeds the fuzzy
/// popularity leverage.
const DOC_COUNT_SCALE: u64 = 1000;

/// Executes compound queries against one snapshot.
pub struct QueryExecutor<'a> {
    snapshot: &'a dyn Snapshot,
    coefficients: &'a CoefficientTable,
}

impl<'a> QueryExecutor<'a> {
    pub fn new(snapshot: &'a dyn Snapshot, coefficients: &'a CoefficientTable) -> Self {
        Self {
            snapshot,
            coefficients,
        }
    }

    /// Run the query and return at most `k` hits, best first. Ties break by
    /// ascending doc id; the order among equal scores is otherwise
    /// implementation-defined.
    pub fn search(&self, query: &CompoundQuery, k: usize) -> Result<Vec<Hit>> {
        let mut slot_scores = Vec::with_capacity(query.slots.len());
        for slot in &query.slots {
            slot_scores.push(self.evaluate_slot(slot)?);
        }

        let mut totals: AHashMap<DocId, f32> = AHashMap::new();
        match query.occur {
            Occur::Must => {
                if slot_scores.is_empty() {
                    return Ok(Vec::new());
                }
                let mut candidates: Option<RoaringBitmap> = None;
                for scores in &slot_scores {
                    let docs: RoaringBitmap = scores.keys().copied().collect();
                    candidates = Some(match candidates {
                        Some(existing) => existing & docs,
                        None => docs,
                    });
                }
                for doc in candidates.unwrap_or_default() {
                    let total = slot_scores
                        .iter()
                        .filter_map(|scores| scores.get(&doc))
                        .sum();
                    totals.insert(doc, total);
                }
            }
            Occur::Should => {
                for scores in slot_scores {
                    for (doc, score) in scores {
                        *totals.entry(doc).or_default() += score;
                    }
                }
            }
        }

        for filter in &query.filters {
            let allowed: RoaringBitmap = self
                .snapshot
                .postings(&filter.field, &filter.term)?
                .iter()
                .map(|p| p.doc)
                .collect();
            totals.retain(|doc, _| allowed.contains(*doc));
        }

        if let Some(boost) = &query.weight_boost {
            for (doc, score) in totals.iter_mut() {
                if let Some(value) = self.snapshot.numeric_value(*doc, &boost.field) {
                    *score += value * boost.coeff;
                }
            }
        }

        let mut hits: Vec<Hit> = totals
            .into_iter()
            .map(|(doc, score)| Hit { doc, score })
            .collect();
        hits.sort_by(|a, b| b.score.total_cmp(&a.score).then(a.doc.cmp(&b.doc)));
        hits.truncate(k);
        Ok(hits)
    }

    /// Best-of across the slot's strategies: for each document the highest
    /// strategy score wins, alternatives never stack.
    fn evaluate_slot(&self, slot: &StrategySlot) -> Result<AHashMap<DocId, f32>> {
        let mut best: AHashMap<DocId, f32> = AHashMap::new();
        for strategy in &slot.strategies {
            for (doc, score) in self.evaluate_strategy(strategy)? {
                best.entry(doc)
                    .and_modify(|b| *b = b.max(score))
                    .or_insert(score);
            }
        }
        Ok(best)
    }

    fn evaluate_strategy(&self, strategy: &TermStrategy) -> Result<AHashMap<DocId, f32>> {
        let mut scores: AHashMap<DocId, f32> = AHashMap::new();

        // A fuzzy strategy becomes a set of expanded terms, each carrying a
        // similarity/popularity boost; anything else is its own single term.
        let expanded: Vec<(String, f32)> = match strategy.fuzzy {
            Some(params) => {
                let scaled_doc_count = self.snapshot.doc_count() / DOC_COUNT_SCALE;
                let term_len = strategy.term.chars().count();
                self.snapshot
                    .expand_terms(
                        &strategy.field,
                        &strategy.term,
                        params.max_edits,
                        params.prefix_len,
                    )?
                    .into_iter()
                    .map(|expansion| {
                        let doc_freq = self.snapshot.doc_freq(&strategy.field, &expansion.term);
                        let boost = fuzzy_term_boost(
                            term_len,
                            expansion.edits,
                            doc_freq,
                            scaled_doc_count,
                        );
                        (expansion.term, boost)
                    })
                    .collect()
            }
            None => vec![(strategy.term.clone(), 1.0)],
        };

        for (term, span_boost) in expanded {
            for posting in self.snapshot.postings(&strategy.field, &term)? {
                let score = match strategy.position {
                    Some(position) => {
                        let mut acc = PayloadAccumulator::default();
                        acc.start_doc();
                        for occurrence in &posting.occurrences {
                            let coefficient = occurrence
                                .payload
                                .as_deref()
                                .and_then(decode_position)
                                .map(|word_position| {
                                    let delta = word_position as i64 - position as i64;
                                    self.coefficients.coefficient(position as usize, delta)
                                });
                            acc.collect(coefficient);
                        }
                        combine_doc_score(span_boost, None, acc.factor(), strategy.weight)
                    }
                    None => combine_doc_score(span_boost, None, 1.0, strategy.weight),
                };
                scores
                    .entry(posting.doc)
                    .and_modify(|b| *b = b.max(score))
                    .or_insert(score);
            }
        }

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::memory::MemoryIndex;
    use crate::index::types::FieldMap;
    use crate::query::analysis::QueryAnalysis;
    use crate::query::builder::{
        DEFAULT_POSITION_WORD_LIMIT, Filter, QueryStrategyBuilder, StrategyKind,
    };
    use crate::analysis::analyzer::NormalizingAnalyzer;

    fn fields() -> FieldMap {
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

    fn index() -> MemoryIndex {
        let mut builder = MemoryIndex::builder(fields());
        builder
            .push_with("apple ipad pro", None, Some(b"tablets"))
            .push_with("case for apple ipad", None, Some(b"accessories"))
            .push_with("apple iphone 13", None, Some(b"phones"));
        builder.build().unwrap()
    }

    fn search(index: &MemoryIndex, text: &str, occur: Occur, k: usize) -> Vec<Hit> {
        let analysis = QueryAnalysis::parse(text, &NormalizingAnalyzer);
        let f = fields();
        let query =
            QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0).build(&analysis, occur);
        let table = CoefficientTable::default();
        QueryExecutor::new(index, &table)
            .search(&query, k)
            .unwrap()
    }

    #[test]
    fn test_position_match_outranks_shifted_match() {
        let index = index();
        let hits = search(&index, "apple ipad ", Occur::Must, 10);
        assert_eq!(hits.len(), 2);
        // Doc 0 has both words in their expected slots; doc 1 has them
        // shifted two slots right and decays accordingly.
        assert_eq!(hits[0].doc, 0);
        assert_eq!(hits[1].doc, 1);
        assert!(hits[0].score > hits[1].score);
    }

    #[test]
    fn test_must_requires_every_slot() {
        let index = index();
        let hits = search(&index, "apple pro ", Occur::Must, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc, 0);
    }

    #[test]
    fn test_should_unions_slots() {
        let index = index();
        let hits = search(&index, "apple pro ", Occur::Should, 10);
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_top_k_truncation() {
        let index = index();
        let hits = search(&index, "apple", Occur::Must, 1);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_prefix_token_matches_through_ngram_field() {
        let index = index();
        // "thermo"-style single incomplete word: "ipho" only exists as an
        // n-gram of "iphone".
        let hits = search(&index, "ipho", Occur::Must, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc, 2);
    }

    #[test]
    fn test_fuzzy_recovers_typo() {
        let index = index();
        let hits = search(&index, "aplle ipad ", Occur::Must, 10);
        assert!(!hits.is_empty());
        assert_eq!(hits[0].doc, 0);
    }

    #[test]
    fn test_cut_word_recovers_missing_space() {
        let index = index();
        // "appleipad" as two tokens glued together matches the concat and
        // second-ngram fields through the cut-word strategies.
        let analysis = QueryAnalysis::parse("appleipad", &NormalizingAnalyzer);
        let f = fields();
        let query = QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0)
            .build(&analysis, Occur::Must);
        let table = CoefficientTable::default();
        let hits = QueryExecutor::new(&index, &table).search(&query, 10).unwrap();
        assert!(hits.iter().any(|h| h.doc == 0 || h.doc == 1));
    }

    #[test]
    fn test_context_filter_restricts_results() {
        let index = index();
        let analysis = QueryAnalysis::parse("apple ", &NormalizingAnalyzer);
        let f = fields();
        let mut query = QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0)
            .build(&analysis, Occur::Must);
        query.filters.push(Filter {
            field: "category".into(),
            term: "phones".into(),
        });
        let table = CoefficientTable::default();
        let hits = QueryExecutor::new(&index, &table).search(&query, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].doc, 2);
    }

    #[test]
    fn test_weight_boost_added_to_totals() {
        let f = fields();
        let mut builder = MemoryIndex::builder(f.clone());
        builder
            .push_with("galaxy tab", Some(0.0), None)
            .push_with("galaxy fold", Some(50.0), None);
        let index = builder.build().unwrap();

        let analysis = QueryAnalysis::parse("galaxy ", &NormalizingAnalyzer);
        let query = QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0)
            .build(&analysis, Occur::Must);
        let table = CoefficientTable::default();
        let hits = QueryExecutor::new(&index, &table).search(&query, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].doc, 1);
        assert!(hits[0].score - hits[1].score > 49.0);
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let index = index();
        let hits = search(&index, "   ", Occur::Must, 10);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_tie_break_by_doc_id() {
        let f = fields();
        let mut builder = MemoryIndex::builder(f.clone());
        builder.push("same text").push("same text");
        let index = builder.build().unwrap();
        let analysis = QueryAnalysis::parse("same ", &NormalizingAnalyzer);
        let query = QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0)
            .build(&analysis, Occur::Must);
        let table = CoefficientTable::default();
        let hits = QueryExecutor::new(&index, &table).search(&query, 10).unwrap();
        assert_eq!(hits[0].doc, 0);
        assert_eq!(hits[1].doc, 1);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn test_strategy_kinds_do_not_stack() {
        // One slot whose exact and ngram strategies both match the same
        // doc: the slot contributes the max, not the sum.
        let index = index();
        let analysis = QueryAnalysis::parse("apple ", &NormalizingAnalyzer);
        let f = fields();
        let query = QueryStrategyBuilder::new(&f, DEFAULT_POSITION_WORD_LIMIT, 1.0)
            .build(&analysis, Occur::Must);
        let slot = &query.slots[0];
        assert!(slot.strategies.iter().any(|s| s.kind == StrategyKind::Exact));
        assert!(slot.strategies.iter().any(|s| s.kind == StrategyKind::Ngram));

        let table = CoefficientTable::default();
        let executor = QueryExecutor::new(&index, &table);
        let slot_scores = executor.evaluate_slot(slot).unwrap();
        let exact_only = executor
            .evaluate_strategy(&slot.strategies[0])
            .unwrap();
        // "apple" sits at position 1 in docs 0 and 2: coefficient 15 at
        // weight 1.0 dominates every other strategy, so the slot score
        // equals the exact strategy's score.
        assert_eq!(slot_scores.get(&0), exact_only.get(&0));
    }
}
