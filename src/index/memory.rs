//! In-memory reference index.
//!
//! A deliberately simple [`Snapshot`] implementation: no segments, no
//! persistence, no merging. It exists so the suggestion pipeline can be
//! exercised end to end (tests, docs, benches) without binding to a real
//! index engine, and it doubles as the reference for what the analysis
//! chain is expected to produce per field role.

use crate::analysis::analyzer::{NormalizingAnalyzer, TextAnalyzer};
use crate::analysis::dedup::dedup_tokens;
use crate::analysis::position::{PositionCodec, encode_position};
use crate::index::snapshot::Snapshot;
use crate::index::types::{DocId, Expansion, FieldMap, Occurrence, Posting};
use anyhow::Result;
use ahash::{AHashMap, AHashSet};

/// Longest n-gram derived from a term.
const NGRAM_MAX: usize = 15;

struct StoredDoc {
    text: String,
    weight: Option<f32>,
    context: Option<Vec<u8>>,
}

/// Builder for a [`MemoryIndex`].
///
/// Field recipes per role:
/// - normal/payload: deduplicated words, position payloads
/// - ngram: character n-grams (1..=15) of each word, inheriting the word's
///   position payload
/// - concat: adjacent-word pairs, payload of the leading word
/// - ngram_second: n-grams of those pairs
pub struct MemoryIndexBuilder {
    fields: FieldMap,
    analyzer: NormalizingAnalyzer,
    codec: PositionCodec,
    docs: Vec<StoredDoc>,
}

impl MemoryIndexBuilder {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            analyzer: NormalizingAnalyzer,
            codec: PositionCodec::default(),
            docs: Vec::new(),
        }
    }

    /// Add a document with display text only.
    pub fn push(&mut self, text: impl Into<String>) -> &mut Self {
        self.push_with(text, None, None)
    }

    /// Add a document with an optional ranking weight and context label.
    pub fn push_with(
        &mut self,
        text: impl Into<String>,
        weight: Option<f32>,
        context: Option<&[u8]>,
    ) -> &mut Self {
        self.docs.push(StoredDoc {
            text: text.into(),
            weight,
            context: context.map(<[u8]>::to_vec),
        });
        self
    }

    pub fn build(self) -> Result<MemoryIndex> {
        let mut index = MemoryIndex {
            fields: AHashMap::new(),
            field_map: self.fields.clone(),
            docs: Vec::with_capacity(self.docs.len()),
        };

        for (i, doc) in self.docs.into_iter().enumerate() {
            let doc_id = i as DocId;
            index.index_doc(doc_id, &doc, &self.analyzer, &self.codec)?;
            index.docs.push(doc);
        }

        Ok(index)
    }
}

/// In-memory postings plus stored fields. Immutable once built.
pub struct MemoryIndex {
    /// field name -> term -> postings (docs in ascending order)
    fields: AHashMap<String, AHashMap<String, Vec<Posting>>>,
    field_map: FieldMap,
    docs: Vec<StoredDoc>,
}

impl MemoryIndex {
    pub fn builder(fields: FieldMap) -> MemoryIndexBuilder {
        MemoryIndexBuilder::new(fields)
    }

    fn index_doc(
        &mut self,
        doc: DocId,
        source: &StoredDoc,
        analyzer: &NormalizingAnalyzer,
        codec: &PositionCodec,
    ) -> Result<()> {
        let tokens = analyzer.analyze(&source.text)?;

        // Raw word sequence with positions, before deduplication. Pair
        // derivation needs adjacency that dedup would destroy.
        let mut positioned: Vec<(String, f32)> = Vec::with_capacity(tokens.len());
        let mut position = 0f32;
        for token in &tokens {
            position += token.position_increment as f32;
            positioned.push((token.text.clone(), position));
        }

        // Position chain for the word fields: dedup, annotate, split.
        let mut chain = tokens;
        dedup_tokens(&mut chain);
        codec.annotate(&mut chain);

        // The normal and payload roles often name the same physical field;
        // index it once.
        let mut term_fields: Vec<String> = [&self.field_map.normal, &self.field_map.payload]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        term_fields.dedup();

        for token in &chain {
            let (term, payload) = codec.extract(&token.text)?;
            if term.is_empty() {
                continue;
            }
            let Some(payload) = payload else { continue };

            for field in &term_fields {
                self.add_occurrence(field, &term, doc, payload.clone());
            }
            if let Some(ngram_field) = self.field_map.ngram.clone() {
                for gram in ngrams(&term) {
                    self.add_occurrence(&ngram_field, &gram, doc, payload.clone());
                }
            }
        }

        // Adjacent-word pairs for the concatenation fields.
        for pair in positioned.windows(2) {
            let concat = format!("{}{}", pair[0].0, pair[1].0);
            let payload = encode_position(pair[0].1).to_vec();

            if let Some(concat_field) = self.field_map.concat.clone() {
                self.add_occurrence(&concat_field, &concat, doc, payload.clone());
            }
            if let Some(second_field) = self.field_map.ngram_second.clone() {
                for gram in ngrams(&concat) {
                    self.add_occurrence(&second_field, &gram, doc, payload.clone());
                }
            }
        }

        // Context labels are indexed as single terms without payloads so
        // filtered lookups can restrict on them.
        if let Some(field) = self.field_map.context.clone()
            && let Some(context) = &source.context
        {
            let term = String::from_utf8_lossy(context).to_string();
            self.fields
                .entry(field)
                .or_default()
                .entry(term)
                .or_default()
                .push(Posting {
                    doc,
                    occurrences: vec![Occurrence::default()],
                });
        }

        Ok(())
    }

    fn add_occurrence(&mut self, field: &str, term: &str, doc: DocId, payload: Vec<u8>) {
        let postings = self
            .fields
            .entry(field.to_string())
            .or_default()
            .entry(term.to_string())
            .or_default();
        let occurrence = Occurrence::with_payload(payload);
        match postings.last_mut() {
            Some(last) if last.doc == doc => last.occurrences.push(occurrence),
            _ => postings.push(Posting {
                doc,
                occurrences: vec![occurrence],
            }),
        }
    }
}

impl Snapshot for MemoryIndex {
    fn postings(&self, field: &str, term: &str) -> Result<Vec<Posting>> {
        Ok(self
            .fields
            .get(field)
            .and_then(|terms| terms.get(term))
            .cloned()
            .unwrap_or_default())
    }

    fn expand_terms(
        &self,
        field: &str,
        term: &str,
        max_edits: u32,
        prefix_len: usize,
    ) -> Result<Vec<Expansion>> {
        let Some(terms) = self.fields.get(field) else {
            return Ok(Vec::new());
        };
        let prefix: String = term.chars().take(prefix_len).collect();

        let mut expansions = Vec::new();
        for candidate in terms.keys() {
            if prefix_len > 0 && !candidate.starts_with(&prefix) {
                continue;
            }
            if let Some(edits) = bounded_levenshtein(term, candidate, max_edits) {
                expansions.push(Expansion {
                    term: candidate.clone(),
                    edits,
                });
            }
        }
        expansions.sort_by(|a, b| a.edits.cmp(&b.edits).then_with(|| a.term.cmp(&b.term)));
        Ok(expansions)
    }

    fn doc_freq(&self, field: &str, term: &str) -> u64 {
        self.fields
            .get(field)
            .and_then(|terms| terms.get(term))
            .map_or(0, |postings| postings.len() as u64)
    }

    fn doc_count(&self) -> u64 {
        self.docs.len() as u64
    }

    fn stored_text(&self, doc: DocId, field: &str) -> Result<Option<String>> {
        if self.field_map.display.as_deref() != Some(field) {
            return Ok(None);
        }
        Ok(self.docs.get(doc as usize).map(|d| d.text.clone()))
    }

    fn stored_bytes(&self, doc: DocId, field: &str) -> Result<Option<Vec<u8>>> {
        if self.field_map.context.as_deref() != Some(field) {
            return Ok(None);
        }
        Ok(self
            .docs
            .get(doc as usize)
            .and_then(|d| d.context.clone()))
    }

    fn numeric_value(&self, doc: DocId, field: &str) -> Option<f32> {
        if self.field_map.weight.as_deref() != Some(field) {
            return None;
        }
        self.docs.get(doc as usize).and_then(|d| d.weight)
    }
}

/// All distinct character n-grams of `term` with length 1..=15.
fn ngrams(term: &str) -> Vec<String> {
    let chars: Vec<char> = term.chars().collect();
    let mut grams: AHashSet<String> = AHashSet::new();
    for len in 1..=NGRAM_MAX.min(chars.len()) {
        for window in chars.windows(len) {
            grams.insert(window.iter().collect());
        }
    }
    grams.into_iter().collect()
}

/// Levenshtein distance bounded by `max`.
///
/// Returns `None` as soon as the distance is known to exceed `max`: the
/// length difference is a lower bound, and the DP is abandoned once a full
/// row exceeds the threshold.
fn bounded_levenshtein(a: &str, b: &str, max: u32) -> Option<u32> {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let max = max as usize;

    if a_chars.len().abs_diff(b_chars.len()) > max {
        return None;
    }

    let mut dp: Vec<usize> = (0..=b_chars.len()).collect();
    for (i, &ac) in a_chars.iter().enumerate() {
        let mut prev = dp[0];
        dp[0] = i + 1;
        let mut row_min = dp[0];

        for (j, &bc) in b_chars.iter().enumerate() {
            let tmp = dp[j + 1];
            let cost = usize::from(ac != bc);
            dp[j + 1] = (dp[j + 1] + 1).min(dp[j] + 1).min(prev + cost);
            prev = tmp;
            row_min = row_min.min(dp[j + 1]);
        }

        if row_min > max {
            return None;
        }
    }

    let distance = dp[b_chars.len()];
    (distance <= max).then_some(distance as u32)
}
