//! Position-decay scoring.
//!
//! A matched occurrence is discounted by how far its indexed word position
//! deviates from the slot it was expected to fill. The discount comes from
//! a tiered coefficient lookup; per-document aggregation over repeated
//! occurrences keeps the worst (minimum) coefficient.

use serde::{Deserialize, Serialize};

/// Tiered decay coefficients, configured once per suggester and shared
/// read-only across requests.
///
/// Lookup order for expected position `p` (1-indexed) and delta
/// `indexed - expected`:
/// 1. `per_position[p - 1][delta]` when both indices are in range
/// 2. `defaults[delta]` when in range
/// 3. `scalar_default`, halved when the term appeared before its slot
///
/// Out-of-range indices are the designed fallback path, never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub per_position: Vec<Vec<f32>>,
    pub defaults: Vec<f32>,
    pub scalar_default: f32,
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self {
            per_position: vec![
                vec![15.0, 10.0, 7.0, 5.0, 4.0, 3.0, 2.0, 1.0],
                vec![10.0, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0],
                vec![5.0, 3.0, 2.0, 1.0, 0.5, 0.25],
            ],
            defaults: vec![0.5, 0.4, 0.3],
            scalar_default: 0.1,
        }
    }
}

impl CoefficientTable {
    /// Decay coefficient for a term expected at `query_position` (1-indexed)
    /// and found at indexed word position `query_position + delta`.
    pub fn coefficient(&self, query_position: usize, delta: i64) -> f32 {
        if delta >= 0 {
            let delta = delta as usize;
            if let Some(row) = query_position
                .checked_sub(1)
                .and_then(|row| self.per_position.get(row))
                && let Some(c) = row.get(delta)
            {
                return *c;
            }
            if let Some(c) = self.defaults.get(delta) {
                return *c;
            }
        }
        // Inverted words: 50% penalty.
        self.scalar_default * if delta < 0 { 0.5 } else { 1.0 }
    }
}

/// Per-document aggregation of occurrence coefficients.
///
/// Reset at the start of each document. A payload-less occurrence zeroes
/// the running minimum unconditionally, even after better coefficients were
/// seen; the ordering dependence is deliberate and preserved.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadAccumulator {
    payloads_seen: u32,
    payload_score: f32,
}

impl PayloadAccumulator {
    pub fn start_doc(&mut self) {
        self.payloads_seen = 0;
        self.payload_score = 0.0;
    }

    /// Fold in one occurrence: `Some` carries its decay coefficient, `None`
    /// means the occurrence had no payload.
    pub fn collect(&mut self, coefficient: Option<f32>) {
        match coefficient {
            Some(c) => {
                self.payload_score = if self.payloads_seen == 0 {
                    c
                } else {
                    c.min(self.payload_score)
                };
            }
            None => self.payload_score = 0.0,
        }
        self.payloads_seen += 1;
    }

    /// Aggregated payload factor: the running minimum, or 1.0 when no
    /// occurrence was seen at all.
    pub fn factor(&self) -> f32 {
        if self.payloads_seen > 0 {
            self.payload_score
        } else {
            1.0
        }
    }
}

/// Final per-document score for one strategy.
pub fn combine_doc_score(
    span_boost: f32,
    underlying: Option<f32>,
    payload_factor: f32,
    query_boost: f32,
) -> f32 {
    span_boost * underlying.unwrap_or(1.0) * payload_factor * query_boost
}

/// Boost applied to a fuzzy-expanded term: a similarity discount per edit,
/// scaled down for terms much rarer than the collection suggests.
///
/// `scaled_doc_count` is the collection document count divided by 1000.
pub fn fuzzy_term_boost(term_len: usize, edits: u32, doc_freq: u64, scaled_doc_count: u64) -> f32 {
    let similarity = if term_len == 0 {
        1.0
    } else {
        1.0 - edits as f32 / term_len as f32
    };
    let denominator = (doc_freq + scaled_doc_count) as f32;
    let popularity = if denominator > 0.0 {
        1.0 - (0.3 * scaled_doc_count as f32) / denominator
    } else {
        1.0
    };
    similarity * popularity
}
