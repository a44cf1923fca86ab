use serde::{Deserialize, Serialize};

/// Unique identifier for a document in the index
pub type DocId = u32;

/// One occurrence of a term in a document.
///
/// The payload is opaque to the index; this crate's position chain stores
/// the occurrence's word position in it (4-byte big-endian f32).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Occurrence {
    pub payload: Option<Vec<u8>>,
}

impl Occurrence {
    pub fn with_payload(payload: Vec<u8>) -> Self {
        Self {
            payload: Some(payload),
        }
    }
}

/// Postings entry: all occurrences of one term in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub doc: DocId,
    pub occurrences: Vec<Occurrence>,
}

/// A term produced by fuzzy expansion, with its edit distance from the
/// query term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expansion {
    pub term: String,
    pub edits: u32,
}

/// A scored search hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub doc: DocId,
    pub score: f32,
}

/// Index field names by role.
///
/// Every role is optional; a role without a field name disables the
/// retrieval strategies that would target it. The same physical field may
/// serve several roles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    /// Exact word matches with position payloads.
    pub normal: Option<String>,
    /// Payload-carrying variant used by prefix-token strategies.
    pub payload: Option<String>,
    /// Character n-grams of each word.
    pub ngram: Option<String>,
    /// N-grams of adjacent-word concatenations.
    pub ngram_second: Option<String>,
    /// Adjacent-word concatenations with position payloads.
    pub concat: Option<String>,
    /// Per-document numeric ranking signal.
    pub weight: Option<String>,
    /// Stored display text.
    pub display: Option<String>,
    /// Stored context label bytes.
    pub context: Option<String>,
}
