//! End-to-end suggestion lookups.
//!
//! Orchestrates a lookup: length gate, repetition cleanup, cache probe,
//! snapshot acquisition, query analysis, compound query construction,
//! top-K search, result assembly with optional highlighting, cache store.

use crate::analysis::analyzer::{NormalizingAnalyzer, TextAnalyzer};
use crate::index::snapshot::{Snapshot, SnapshotManager};
use crate::index::types::Hit;
use crate::query::analysis::{QueryAnalysis, clean_repetitions};
use crate::query::builder::{Filter, Occur, QueryStrategyBuilder};
use crate::query::executor::QueryExecutor;
use crate::query::scorer::CoefficientTable;
use crate::suggest::cache::{CacheKey, SuggestionCache};
use crate::suggest::config::SuggesterConfig;
use crate::suggest::highlight::highlight;
use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Scores are returned as fixed-point integers with this scale.
const SCORE_SCALE: f64 = 1_000_000.0;

/// One lookup request. `None` option fields fall back to the suggester
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRequest {
    pub token: String,
    pub count: usize,
    pub context_filter: Option<String>,
    pub all_terms_required: Option<bool>,
    pub highlight: Option<bool>,
    pub first_context_only: Option<bool>,
}

impl LookupRequest {
    pub fn new(token: impl Into<String>, count: usize) -> Self {
        Self {
            token: token.into(),
            count,
            ..Self::default()
        }
    }
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub highlight: Option<String>,
    /// Fixed-point score, scaled by 1,000,000.
    pub score: i64,
    /// Opaque context labels attached to the hit.
    pub contexts: BTreeSet<Vec<u8>>,
}

/// Ordered suggestions plus the found-count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupResponse {
    pub suggestions: Vec<Suggestion>,
    pub num_found: usize,
}

/// A configured suggester bound to an index snapshot source.
///
/// Configuration, the coefficient table and the analyzer are immutable
/// after construction and shared read-only across concurrent lookups; the
/// result cache is the only shared mutable structure.
pub struct Suggester {
    config: SuggesterConfig,
    analyzer: Arc<dyn TextAnalyzer>,
    coefficients: CoefficientTable,
    snapshots: SnapshotManager,
    cache: Option<SuggestionCache>,
}

impl Suggester {
    /// Create a suggester, failing fast on configuration errors. The codec
    /// settings are validated here too; the indexing side of the same
    /// deployment builds its codec from the same configuration.
    pub fn new(config: SuggesterConfig, snapshot: Arc<dyn Snapshot>) -> Result<Self> {
        config.validate()?;
        let cache = config
            .cache
            .as_ref()
            .map(|c| SuggestionCache::new(c.capacity));
        Ok(Self {
            config,
            analyzer: Arc::new(NormalizingAnalyzer),
            coefficients: CoefficientTable::default(),
            snapshots: SnapshotManager::new(snapshot),
            cache,
        })
    }

    /// Replace the built-in analyzer.
    pub fn with_analyzer(mut self, analyzer: Arc<dyn TextAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Replace the default coefficient table.
    pub fn with_coefficients(mut self, coefficients: CoefficientTable) -> Self {
        self.coefficients = coefficients;
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Install a new index snapshot and invalidate the result cache.
    pub fn update_snapshot(&self, snapshot: Arc<dyn Snapshot>) {
        self.snapshots.swap(snapshot);
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    /// Total documents visible through the current snapshot.
    pub fn doc_count(&self) -> u64 {
        self.snapshots.acquire().doc_count()
    }

    /// Execute one lookup.
    ///
    /// Index search failures propagate; query analysis failures degrade to
    /// an empty response.
    pub fn lookup(&self, request: &LookupRequest) -> Result<LookupResponse> {
        if request.token.chars().count() < self.config.min_query_len {
            return Ok(LookupResponse::default());
        }

        let all_terms_required = request
            .all_terms_required
            .unwrap_or(self.config.all_terms_required);
        let do_highlight = request.highlight.unwrap_or(self.config.highlight);
        let first_context_only = request
            .first_context_only
            .unwrap_or(self.config.first_context_only);

        // Cache probe. Key encoding is best-effort: a failure only skips
        // the cache.
        let cache_key = self.cache_key_for(request, all_terms_required, do_highlight);
        if let (Some(cache), Some(key)) = (&self.cache, &cache_key)
            && let Some(response) = cache.get(key)
        {
            log::debug!("cache hit for {:?}", request.token);
            return Ok(response);
        }

        // Snapshot handle is held for the rest of the lookup and released
        // on drop, on every exit path.
        let snapshot = self.snapshots.acquire();

        let query_text = clean_repetitions(&request.token);
        let analysis = QueryAnalysis::parse(&query_text, self.analyzer.as_ref());
        log::debug!(
            "lookup {:?}: {} matched, prefix {:?}",
            request.token,
            analysis.matched_tokens.len(),
            analysis.prefix_token
        );

        let occur = if all_terms_required {
            Occur::Must
        } else {
            Occur::Should
        };
        let builder = QueryStrategyBuilder::new(
            &self.config.fields,
            self.config.position_match_threshold,
            self.config.weight_coeff,
        );
        let mut query = builder.build(&analysis, occur);

        if let Some(filter) = request.context_filter.as_deref()
            && let Some(field) = self.config.fields.context.as_deref()
        {
            query.filters.push(Filter {
                field: field.to_string(),
                term: filter.to_string(),
            });
        }

        let executor = QueryExecutor::new(snapshot.as_ref(), &self.coefficients);
        let hits = executor.search(&query, request.count)?;

        let response = self.assemble(
            snapshot.as_ref(),
            &hits,
            &analysis,
            do_highlight,
            first_context_only,
        )?;

        if let (Some(cache), Some(key)) = (&self.cache, cache_key) {
            cache.put(key, response.clone());
        }

        Ok(response)
    }

    fn cache_key_for(
        &self,
        request: &LookupRequest,
        all_terms_required: bool,
        do_highlight: bool,
    ) -> Option<String> {
        let cache_config = self.config.cache.as_ref()?;
        if request.token.chars().count() > cache_config.max_query_len {
            return None;
        }
        CacheKey {
            suggester: &self.config.name,
            token: &request.token,
            context_filter: request.context_filter.as_deref(),
            count: request.count,
            all_terms_required,
            highlight: do_highlight,
        }
        .encode()
        .ok()
    }

    fn assemble(
        &self,
        snapshot: &dyn Snapshot,
        hits: &[Hit],
        analysis: &QueryAnalysis,
        do_highlight: bool,
        first_context_only: bool,
    ) -> Result<LookupResponse> {
        let display_field = self.config.fields.display.as_deref();
        let context_field = self.config.fields.context.as_deref();

        let mut suggestions = Vec::with_capacity(hits.len());
        for (i, hit) in hits.iter().enumerate() {
            let text = match display_field {
                Some(field) => snapshot.stored_text(hit.doc, field)?.unwrap_or_default(),
                None => String::new(),
            };

            let mut contexts = BTreeSet::new();
            if (!first_context_only || i == 0)
                && let Some(field) = context_field
                && let Some(bytes) = snapshot.stored_bytes(hit.doc, field)?
            {
                contexts.insert(bytes);
            }

            let highlighted = if do_highlight {
                Some(highlight(
                    &text,
                    &analysis.matched_tokens,
                    analysis.prefix_token.as_deref(),
                    self.analyzer.as_ref(),
                )?)
            } else {
                None
            };

            suggestions.push(Suggestion {
                text,
                highlight: highlighted,
                score: (hit.score as f64 * SCORE_SCALE) as i64,
                contexts,
            });
        }

        Ok(LookupResponse {
            num_found: suggestions.len(),
            suggestions,
        })
    }
}
