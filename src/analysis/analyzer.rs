//! Text analysis: tokenization and normalization.
//!
//! The analyzer splits raw text into letter-or-digit runs, lowercases them
//! and strips diacritics, keeping the byte offsets of each token into the
//! raw input so highlighting can recover the surface form.

use anyhow::Result;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// A single analyzed token.
///
/// `start`/`end` are byte offsets into the raw input; `text` is the
/// normalized form. The position increment is 1 for ordinary tokens and
/// may be larger when an upstream stage removed tokens from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub position_increment: u32,
}

/// Analyzer seam between raw text and the query/index pipeline.
///
/// The built-in [`NormalizingAnalyzer`] never fails; the `Result` exists for
/// custom analyzers backed by external tokenization that can. Callers on the
/// query path treat an error as a degraded (empty) analysis rather than a
/// fatal condition.
pub trait TextAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Result<Vec<Token>>;
}

/// Default analyzer: letter-or-digit tokenization, lowercasing, diacritic
/// folding. `"Ceci est un test.. !"` analyzes to `ceci`, `est`, `un`, `test`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizingAnalyzer;

impl TextAnalyzer for NormalizingAnalyzer {
    fn analyze(&self, text: &str) -> Result<Vec<Token>> {
        Ok(tokenize(text))
    }
}

/// Split `text` into alphanumeric runs with raw byte offsets.
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_alphanumeric() {
            if start.is_none() {
                start = Some(idx);
            }
        } else if let Some(s) = start.take() {
            tokens.push(make_token(text, s, idx));
        }
    }
    if let Some(s) = start {
        tokens.push(make_token(text, s, text.len()));
    }

    tokens
}

fn make_token(text: &str, start: usize, end: usize) -> Token {
    Token {
        text: normalize(&text[start..end]),
        start,
        end,
        position_increment: 1,
    }
}

/// Lowercase and strip diacritics (NFD decomposition, combining marks
/// dropped). `"Télé"` normalizes to `"tele"`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}
