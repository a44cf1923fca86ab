//! Compound query construction.
//!
//! Each query token becomes a best-of (dis-max) slot of retrieval
//! strategies: exact positional match, fuzzy positional match, n-gram
//! positional match, cut-word match, concatenation match. Long queries
//! switch to a simpler, position-agnostic strategy set per token.

use crate::index::types::FieldMap;
use crate::query::analysis::QueryAnalysis;

/// Tokens longer than this get two fuzzy edits instead of one.
const FUZZY_TWO_EDITS_MIN_LEN: usize = 6;
/// Slots below this position stay positional regardless of query length.
const POSITIONAL_SLOT_CUTOFF: u32 = 5;
/// Default word-count threshold for the positional branch.
pub const DEFAULT_POSITION_WORD_LIMIT: usize = 6;

/// Top-level clause requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// Every token slot must match.
    Must,
    /// Any token slot may match.
    Should,
}

/// What a strategy is for. Structurally many are term matches on different
/// fields; the tag keeps provenance visible in debug output and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Exact,
    Fuzzy,
    Ngram,
    NgramSecond,
    CutWord,
    Concat,
}

/// Bounded-edit-distance expansion parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyParams {
    pub max_edits: u32,
    pub prefix_len: usize,
}

/// One retrieval strategy for one token slot.
///
/// `position` is the 1-indexed query slot for positional strategies and
/// `None` for flat term matches. `fuzzy` turns the term into a
/// bounded-edit-distance expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct TermStrategy {
    pub kind: StrategyKind,
    pub field: String,
    pub term: String,
    pub position: Option<u32>,
    pub fuzzy: Option<FuzzyParams>,
    pub weight: f32,
}

/// Best-of disjunction over the strategies of one token slot: alternatives
/// do not stack additively, the best one wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategySlot {
    pub strategies: Vec<TermStrategy>,
}

/// Non-scoring required clause (context filtering).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub term: String,
}

/// Additive external ranking signal: a stored numeric field scaled by a
/// coefficient.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightBoost {
    pub field: String,
    pub coeff: f32,
}

/// The full retrieval expression for one lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundQuery {
    pub slots: Vec<StrategySlot>,
    pub filters: Vec<Filter>,
    pub occur: Occur,
    pub weight_boost: Option<WeightBoost>,
}

/// Field resolution and weights for one branch (matched tokens or prefix
/// token). A role resolving to `None` disables its strategies.
#[derive(Debug, Clone, Default, PartialEq)]
struct FieldStrategySet {
    /// Target of exact and fuzzy word strategies.
    normal: Option<String>,
    /// Fallback target when no n-gram field is configured.
    fuzzy_fallback: Option<String>,
    ngram: Option<String>,
    ngram_second: Option<String>,
    concat: Option<String>,
    weights: StrategyWeights,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StrategyWeights {
    normal: f32,
    fuzzy: f32,
    ngram: f32,
    ngram_second: f32,
    concat: f32,
}

impl Default for StrategyWeights {
    fn default() -> Self {
        Self {
            normal: 1.0,
            fuzzy: 0.8,
            ngram: 0.9,
            ngram_second: 1.3,
            concat: 0.8,
        }
    }
}

impl FieldStrategySet {
    fn for_matched(fields: &FieldMap) -> Self {
        Self {
            normal: fields.normal.clone(),
            fuzzy_fallback: fields.payload.clone(),
            ngram: fields.ngram.clone(),
            ngram_second: fields.ngram_second.clone(),
            concat: fields.concat.clone(),
            weights: StrategyWeights::default(),
        }
    }

    fn for_prefix(fields: &FieldMap) -> Self {
        Self {
            // The prefix branch matches on the payload-carrying field,
            // falling back to the normal field when none is configured.
            normal: fields.payload.clone().or_else(|| fields.normal.clone()),
            fuzzy_fallback: fields.payload.clone(),
            ngram: fields.ngram.clone(),
            ngram_second: fields.ngram_second.clone(),
            concat: fields.concat.clone(),
            weights: StrategyWeights {
                normal: 1.0,
                fuzzy: 0.8,
                ngram: 1.0,
                ngram_second: 0.3,
                concat: 0.8,
            },
        }
    }
}

/// Builds the compound retrieval expression for one analyzed query.
pub struct QueryStrategyBuilder<'a> {
    fields: &'a FieldMap,
    position_word_limit: usize,
    weight_coeff: f32,
}

impl<'a> QueryStrategyBuilder<'a> {
    pub fn new(fields: &'a FieldMap, position_word_limit: usize, weight_coeff: f32) -> Self {
        Self {
            fields,
            position_word_limit,
            weight_coeff,
        }
    }

    pub fn build(&self, analysis: &QueryAnalysis, occur: Occur) -> CompoundQuery {
        let mut slots = Vec::with_capacity(analysis.matched_tokens.len() + 1);

        let matched_set = FieldStrategySet::for_matched(self.fields);
        let mut position: u32 = 1;
        for token in &analysis.matched_tokens {
            let mut list = Vec::new();
            if analysis.word_count <= self.position_word_limit
                || position < POSITIONAL_SLOT_CUTOFF
            {
                self.push_normal_and_fuzzy(&mut list, &matched_set, token, position);
                self.push_ngram(&mut list, &matched_set, token, position);
                self.push_cut_word(&mut list, &matched_set, position, analysis);
                self.push_concat(&mut list, &matched_set, token, position, analysis);
            } else {
                self.push_flat(&mut list, &matched_set, token, position, analysis);
            }
            if !list.is_empty() {
                slots.push(StrategySlot { strategies: list });
            }
            position += 1;
        }

        if let Some(slot) = self.prefix_slot(analysis, position) {
            slots.push(slot);
        }

        let weight_boost = self.fields.weight.clone().map(|field| WeightBoost {
            field,
            coeff: self.weight_coeff,
        });

        CompoundQuery {
            slots,
            filters: Vec::new(),
            occur,
            weight_boost,
        }
    }

    fn push_normal_and_fuzzy(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        token: &str,
        position: u32,
    ) {
        if let Some(field) = &set.normal {
            list.push(positional(
                StrategyKind::Exact,
                field,
                token,
                position,
                set.weights.normal,
            ));
            if char_len(token) > 2 {
                list.push(positional_fuzzy(field, token, 0, position, set.weights.fuzzy));
            }
        }
    }

    fn push_ngram(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        token: &str,
        position: u32,
    ) {
        match &set.ngram {
            Some(field) => list.push(positional(
                StrategyKind::Ngram,
                field,
                token,
                position,
                set.weights.ngram,
            )),
            None => {
                // No n-gram field: one more exact positional match on the
                // fallback field, at the normal weight.
                if let Some(field) = set.fuzzy_fallback.as_ref().or(set.normal.as_ref()) {
                    list.push(positional(
                        StrategyKind::Exact,
                        field,
                        token,
                        position,
                        set.weights.normal,
                    ));
                }
            }
        }
    }

    fn push_cut_word(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        position: u32,
        analysis: &QueryAnalysis,
    ) {
        let Some(field) = &set.ngram else { return };
        if let Some(cut) = analysis.concatenations.get(position as usize - 1) {
            list.push(positional(
                StrategyKind::CutWord,
                field,
                cut,
                position,
                set.weights.ngram_second,
            ));
        }
    }

    fn push_concat(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        token: &str,
        position: u32,
        analysis: &QueryAnalysis,
    ) {
        // The concatenation field indexes adjacent-word pairs, so the match
        // target is the full concatenation entry for this slot.
        if let Some(field) = &set.concat
            && let Some(entry) = analysis.concatenations.get(position as usize - 1)
        {
            list.push(positional(
                StrategyKind::Concat,
                field,
                entry,
                position,
                set.weights.concat,
            ));
        }
        if let Some(field) = &set.ngram_second {
            list.push(term(
                StrategyKind::NgramSecond,
                field,
                token,
                set.weights.concat,
            ));
        }
    }

    /// Position-agnostic strategy set for tokens past the cutoff in long
    /// queries.
    fn push_flat(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        token: &str,
        position: u32,
        analysis: &QueryAnalysis,
    ) {
        if let Some(field) = &set.normal {
            list.push(term(StrategyKind::Exact, field, token, set.weights.normal));
            // Note: the flat fuzzy length threshold differs from the
            // positional one (4 vs 2); both are load-bearing.
            if char_len(token) > 4 {
                list.push(term_fuzzy(field, token, 1, set.weights.fuzzy));
            }
        }
        if let Some(field) = &set.ngram {
            list.push(term(StrategyKind::Ngram, field, token, set.weights.ngram));
        }
        if let Some(field) = &set.concat {
            list.push(term(StrategyKind::Concat, field, token, set.weights.concat));
        }
        if let (Some(cut), Some(field)) = (
            analysis.concatenations.get(position as usize - 1),
            set.normal.as_ref(),
        ) {
            list.push(term(
                StrategyKind::CutWord,
                field,
                cut,
                set.weights.ngram_second,
            ));
        }
    }

    fn prefix_slot(&self, analysis: &QueryAnalysis, position: u32) -> Option<StrategySlot> {
        let token = analysis.prefix_token.as_deref()?;
        let set = FieldStrategySet::for_prefix(self.fields);
        let mut list = Vec::new();

        if analysis.word_count <= self.position_word_limit {
            self.push_prefix_positional(&mut list, &set, token, position);
        } else {
            self.push_prefix_flat(&mut list, &set, token);
        }

        (!list.is_empty()).then_some(StrategySlot { strategies: list })
    }

    fn push_prefix_positional(
        &self,
        list: &mut Vec<TermStrategy>,
        set: &FieldStrategySet,
        token: &str,
        position: u32,
    ) {
        if let Some(field) = &set.normal {
            list.push(positional(
                StrategyKind::Exact,
                field,
                token,
                position,
                set.weights.normal,
            ));
        }

        let ngram_field = set.ngram.as_ref().or(set.normal.as_ref());
        if let Some(field) = ngram_field {
            list.push(positional(
                StrategyKind::Ngram,
                field,
                token,
                position,
                set.weights.ngram,
            ));
            if char_len(token) > 1 {
                list.push(positional_fuzzy(field, token, 1, position, set.weights.fuzzy));
            }
        }
        if char_len(token) > 2
            && let Some(field) = &set.normal
        {
            list.push(positional_fuzzy(field, token, 0, position, set.weights.fuzzy));
        }

        if let Some(field) = &set.ngram_second {
            // The concatenation a prefix completes starts one slot earlier.
            let anchor = if position > 1 { position - 1 } else { position };
            list.push(positional(
                StrategyKind::NgramSecond,
                field,
                token,
                anchor,
                set.weights.ngram_second,
            ));
        }

        if char_len(token) > 3
            && let Some(field) = &set.concat
        {
            list.push(term(StrategyKind::Concat, field, token, set.weights.concat));
        }
    }

    fn push_prefix_flat(&self, list: &mut Vec<TermStrategy>, set: &FieldStrategySet, token: &str) {
        if let Some(field) = set.ngram.as_ref().or(set.normal.as_ref()) {
            list.push(term(StrategyKind::Ngram, field, token, set.weights.ngram));
            if char_len(token) > 2 {
                list.push(term_fuzzy(field, token, 1, set.weights.fuzzy));
            }
        }
        if let Some(field) = &set.ngram_second {
            list.push(term(
                StrategyKind::NgramSecond,
                field,
                token,
                set.weights.ngram_second,
            ));
        }
        if let Some(field) = &set.concat {
            list.push(term(StrategyKind::Concat, field, token, set.weights.concat));
        }
    }
}

fn char_len(token: &str) -> usize {
    token.chars().count()
}

fn max_edits_for(token: &str) -> u32 {
    if char_len(token) > FUZZY_TWO_EDITS_MIN_LEN {
        2
    } else {
        1
    }
}

fn positional(
    kind: StrategyKind,
    field: &str,
    token: &str,
    position: u32,
    weight: f32,
) -> TermStrategy {
    TermStrategy {
        kind,
        field: field.to_string(),
        term: token.to_string(),
        position: Some(position),
        fuzzy: None,
        weight,
    }
}

fn positional_fuzzy(
    field: &str,
    token: &str,
    prefix_len: usize,
    position: u32,
    weight: f32,
) -> TermStrategy {
    TermStrategy {
        kind: StrategyKind::Fuzzy,
        field: field.to_string(),
        term: token.to_string(),
        position: Some(position),
        fuzzy: Some(FuzzyParams {
            max_edits: max_edits_for(token),
            prefix_len,
        }),
        weight,
    }
}

fn term(kind: StrategyKind, field: &str, token: &str, weight: f32) -> TermStrategy {
    TermStrategy {
        kind,
        field: field.to_string(),
        term: token.to_string(),
        position: None,
        fuzzy: None,
        weight,
    }
}

fn term_fuzzy(field: &str, token: &str, prefix_len: usize, weight: f32) -> TermStrategy {
    TermStrategy {
        kind: StrategyKind::Fuzzy,
        field: field.to_string(),
        term: token.to_string(),
        position: None,
        fuzzy: Some(FuzzyParams {
            max_edits: max_edits_for(token),
            prefix_len,
        }),
        weight,
    }
}
