//! Read access to the index collaborator.
//!
//! The inverted index itself (postings storage, segments, on-disk format)
//! lives outside this crate; lookups see it only through the [`Snapshot`]
//! trait. A [`SnapshotManager`] hands out the current snapshot as a
//! reference-counted handle: each request acquires it once and the handle is
//! released on drop, on every exit path.

use crate::index::types::{DocId, Expansion, Posting};
use anyhow::Result;
use std::sync::{Arc, RwLock};

/// A point-in-time, read-only view of the index.
///
/// Implementations must support concurrent lookups; all methods take `&self`.
pub trait Snapshot: Send + Sync {
    /// Postings for a term in a field, with per-occurrence payloads.
    fn postings(&self, field: &str, term: &str) -> Result<Vec<Posting>>;

    /// Expand a term to every indexed term within `max_edits` edits whose
    /// first `prefix_len` characters match. The exact term is included with
    /// zero edits when indexed.
    fn expand_terms(
        &self,
        field: &str,
        term: &str,
        max_edits: u32,
        prefix_len: usize,
    ) -> Result<Vec<Expansion>>;

    /// Number of documents containing `term` in `field`.
    fn doc_freq(&self, field: &str, term: &str) -> u64;

    /// Total document count of the collection.
    fn doc_count(&self) -> u64;

    /// Stored display text for a document, if the field is stored.
    fn stored_text(&self, doc: DocId, field: &str) -> Result<Option<String>>;

    /// Stored opaque bytes (context labels) for a document.
    fn stored_bytes(&self, doc: DocId, field: &str) -> Result<Option<Vec<u8>>>;

    /// Per-document numeric value (external ranking signal).
    fn numeric_value(&self, doc: DocId, field: &str) -> Option<f32>;
}

/// Holds the current snapshot and swaps it atomically on refresh.
pub struct SnapshotManager {
    current: RwLock<Arc<dyn Snapshot>>,
}

impl SnapshotManager {
    pub fn new(initial: Arc<dyn Snapshot>) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    /// Acquire the current snapshot. The returned handle keeps the snapshot
    /// alive for the duration of the request and releases it when dropped.
    pub fn acquire(&self) -> Arc<dyn Snapshot> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Install a new snapshot. In-flight requests keep the handle they
    /// already acquired; new requests see the replacement.
    pub fn swap(&self, snapshot: Arc<dyn Snapshot>) {
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
        log::info!("installed new index snapshot");
    }
}
