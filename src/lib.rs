//! # AXI - Position-Aware Autocomplete Suggestions
//!
//! AXI ranks and assembles autocomplete suggestions over a positionally
//! indexed text collection. Instead of standard length/frequency relevance,
//! terms are rewarded for appearing near the slot the user typed them in,
//! with tolerance for typos, truncated words and missing spaces.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`analysis`] - Tokenization, normalization and the position-payload codec
//! - [`index`] - The index collaborator interface and an in-memory reference backend
//! - [`query`] - Query analysis, strategy construction, decay scoring, execution
//! - [`suggest`] - The end-to-end suggester: config, cache, highlighting, lookups
//!
//! ## Quick Start
//!
//! ```
//! use axi::index::{FieldMap, MemoryIndex};
//! use axi::suggest::{LookupRequest, Suggester, SuggesterConfig};
//! use std::sync::Arc;
//!
//! let fields = FieldMap {
//!     normal: Some("suggest".into()),
//!     payload: Some("suggest".into()),
//!     ngram: Some("suggest_ngram".into()),
//!     display: Some("display".into()),
//!     ..FieldMap::default()
//! };
//!
//! let mut builder = MemoryIndex::builder(fields.clone());
//! builder.push("apple ipad pro").push("apple iphone 13");
//! let index = Arc::new(builder.build().unwrap());
//!
//! let config = SuggesterConfig { name: "products".into(), fields, ..Default::default() };
//! let suggester = Suggester::new(config, index).unwrap();
//!
//! let response = suggester.lookup(&LookupRequest::new("apple ipa", 5)).unwrap();
//! assert_eq!(response.suggestions[0].highlight.as_deref(), Some("[apple] [ipa]d pro"));
//! ```
//!
//! ## Ranking
//!
//! Each query token becomes a best-of disjunction of retrieval strategies
//! (exact, fuzzy, n-gram, cut-word, concatenation), scored through a tiered
//! position-decay coefficient table. Long queries degrade gracefully to
//! position-agnostic term matching. The inverted index itself is an external
//! collaborator reached through [`index::Snapshot`].

pub mod analysis;
pub mod index;
pub mod query;
pub mod suggest;
