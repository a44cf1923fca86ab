//! Suggestion highlighting.
//!
//! Re-tokenizes the display text and brackets the parts the query matched:
//! whole tokens for completed query words, the typed prefix of the final
//! token otherwise.

use crate::analysis::analyzer::TextAnalyzer;
use anyhow::Result;

/// Highlight `text` against the analyzed query tokens.
///
/// Walks the display tokens in start-offset order with a cursor: text
/// between tokens passes through untouched, overlapping tokens are skipped,
/// matched tokens are bracketed whole, and a token starting with the prefix
/// token gets only the typed characters bracketed.
pub fn highlight(
    text: &str,
    matched_tokens: &[String],
    prefix_token: Option<&str>,
    analyzer: &dyn TextAnalyzer,
) -> Result<String> {
    let tokens = analyzer.analyze(text)?;
    let mut out = String::with_capacity(text.len() + 8);
    let mut upto = 0usize;

    for token in &tokens {
        if upto < token.start {
            out.push_str(&text[upto..token.start]);
            upto = token.start;
        } else if upto > token.start {
            continue;
        }

        if matched_tokens.iter().any(|t| *t == token.text) {
            add_whole_match(&mut out, &text[token.start..token.end]);
            upto = token.end;
        } else if let Some(prefix) = prefix_token
            && token.text.starts_with(prefix)
        {
            add_prefix_match(&mut out, &text[token.start..token.end], prefix);
            upto = token.end;
        }
    }

    if upto < text.len() {
        out.push_str(&text[upto..]);
    }

    Ok(out)
}

fn add_whole_match(out: &mut String, surface: &str) {
    out.push('[');
    out.push_str(surface);
    out.push(']');
}

fn add_prefix_match(out: &mut String, surface: &str, prefix: &str) {
    let prefix_chars = prefix.chars().count();
    if prefix_chars >= surface.chars().count() {
        add_whole_match(out, surface);
        return;
    }
    let split = surface
        .char_indices()
        .nth(prefix_chars)
        .map_or(surface.len(), |(i, _)| i);
    out.push('[');
    out.push_str(&surface[..split]);
    out.push(']');
    out.push_str(&surface[split..]);
}
