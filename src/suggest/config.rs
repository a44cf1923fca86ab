//! Suggester configuration.
//!
//! Deserialized once per suggester definition and validated eagerly: a
//! broken configuration fails construction, it never produces a
//! half-configured suggester.

use crate::analysis::position::PositionCodec;
use crate::index::types::FieldMap;
use crate::query::builder::DEFAULT_POSITION_WORD_LIMIT;
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Result-cache settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Number of cached lookups kept.
    pub capacity: usize,
    /// Only queries up to this many characters are cached.
    pub max_query_len: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            max_query_len: 2,
        }
    }
}

/// Position-payload codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Single-character delimiter between token text and position.
    pub delimiter: String,
    /// Payload encoder name; mandatory ("float" for the position chain).
    pub encoder: Option<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            delimiter: "|".to_string(),
            encoder: Some("float".to_string()),
        }
    }
}

impl CodecConfig {
    pub fn build(&self) -> Result<PositionCodec> {
        PositionCodec::from_config(&self.delimiter, self.encoder.as_deref())
    }
}

/// Full configuration of one suggester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggesterConfig {
    pub name: String,
    pub fields: FieldMap,
    /// Coefficient applied to the stored weight field.
    pub weight_coeff: f32,
    /// Word-count threshold above which strategies go position-agnostic.
    pub position_match_threshold: usize,
    pub all_terms_required: bool,
    pub highlight: bool,
    pub first_context_only: bool,
    /// Queries shorter than this return nothing.
    pub min_query_len: usize,
    pub cache: Option<CacheConfig>,
    pub codec: CodecConfig,
}

impl Default for SuggesterConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            fields: FieldMap::default(),
            weight_coeff: 1.0,
            position_match_threshold: DEFAULT_POSITION_WORD_LIMIT,
            all_terms_required: true,
            highlight: true,
            first_context_only: true,
            min_query_len: 1,
            cache: None,
            codec: CodecConfig::default(),
        }
    }
}

impl SuggesterConfig {
    /// Check the configuration, reporting the first problem found.
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.name.is_empty(), "suggester name must not be empty");
        ensure!(self.min_query_len >= 1, "minimum query length must be >= 1");
        self.codec.build()?;
        if let Some(cache) = &self.cache {
            ensure!(cache.capacity > 0, "cache capacity must be > 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(SuggesterConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_multichar_delimiter() {
        let config = SuggesterConfig {
            codec: CodecConfig {
                delimiter: "||".to_string(),
                encoder: Some("float".to_string()),
            },
            ..SuggesterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_missing_encoder() {
        let config = SuggesterConfig {
            codec: CodecConfig {
                delimiter: "|".to_string(),
                encoder: None,
            },
            ..SuggesterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_cache_capacity() {
        let config = SuggesterConfig {
            cache: Some(CacheConfig {
                capacity: 0,
                max_query_len: 2,
            }),
            ..SuggesterConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let config: SuggesterConfig = serde_json::from_str(
            r#"{
                "name": "products",
                "fields": { "normal": "suggest", "display": "display" },
                "cache": { "capacity": 64 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.name, "products");
        assert_eq!(config.fields.normal.as_deref(), Some("suggest"));
        assert_eq!(config.position_match_threshold, 6);
        assert!(config.all_terms_required);
        assert_eq!(config.cache.unwrap().max_query_len, 2);
        assert_eq!(config.codec.delimiter, "|");
    }
}
