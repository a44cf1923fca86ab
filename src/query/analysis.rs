//! Query-side text analysis.
//!
//! Turns a partially-typed query into the ordered token sets the strategy
//! builder works from: completed words, at most one trailing incomplete
//! word, and the adjacent-word concatenations used to recover compound
//! words split by incomplete typing.

use crate::analysis::analyzer::TextAnalyzer;

/// Analyzed form of one query string. Created fresh per lookup and
/// discarded once the compound query is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryAnalysis {
    /// Completed tokens, unique, in insertion order.
    pub matched_tokens: Vec<String>,
    /// The trailing, possibly-incomplete token, if the raw input ends in
    /// the middle of it.
    pub prefix_token: Option<String>,
    /// Adjacent-token concatenations: every consecutive matched pair, plus
    /// `last_matched + prefix` when a non-blank prefix token exists.
    pub concatenations: Vec<String>,
    /// Number of analyzed words, duplicates included.
    pub word_count: usize,
    /// Total character count across analyzed words.
    pub letter_count: usize,
    /// Whether the raw input ended with a space.
    pub trailing_space: bool,
}

impl QueryAnalysis {
    /// Analyze `text`. An analyzer failure is logged and degrades to an
    /// empty analysis; it is never propagated.
    pub fn parse(text: &str, analyzer: &dyn TextAnalyzer) -> QueryAnalysis {
        let mut analysis = QueryAnalysis {
            trailing_space: text.ends_with(' '),
            ..QueryAnalysis::default()
        };

        let tokens = match analyzer.analyze(text) {
            Ok(tokens) => tokens,
            Err(err) => {
                log::warn!("failed to analyze query {text:?}: {err}");
                Vec::new()
            }
        };

        // One token of lookahead: every token except the last is known to
        // be completed; the last is a prefix only if it runs to the very
        // end of the raw text.
        let mut pending = None;
        for token in &tokens {
            if let Some(prev) = pending.replace(token) {
                analysis.add_matched(prev);
            }
        }
        if let Some(last) = pending {
            let already_matched = analysis.matched_tokens.iter().any(|t| *t == last.text);
            if last.end == text.len() && !already_matched {
                analysis.prefix_token = Some(last.text.clone());
                analysis.letter_count += last.text.chars().count();
                analysis.word_count += 1;
            } else {
                // A trailing repeat of an earlier word counts as completed:
                // the prefix token must never shadow a matched token.
                analysis.add_matched(last);
            }
        }

        analysis.build_concatenations();
        analysis
    }

    fn add_matched(&mut self, token: &crate::analysis::analyzer::Token) {
        if !self.matched_tokens.iter().any(|t| *t == token.text) {
            self.matched_tokens.push(token.text.clone());
        }
        // Counters include duplicates even though the token set does not.
        self.letter_count += token.text.chars().count();
        self.word_count += 1;
    }

    fn build_concatenations(&mut self) {
        for pair in self.matched_tokens.windows(2) {
            self.concatenations.push(format!("{}{}", pair[0], pair[1]));
        }

        if let Some(prefix) = &self.prefix_token {
            if !prefix.trim().is_empty() {
                match self.matched_tokens.last() {
                    Some(last) => self.concatenations.push(format!("{last}{prefix}")),
                    None => self.concatenations.push(prefix.clone()),
                }
            }
        }
    }
}

/// Collapse any run of four or more identical characters to two, so that
/// held-down keys ("iphoooooone") do not defeat fuzzy matching.
pub fn clean_repetitions(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run_char: Option<char> = None;
    let mut run_start = 0usize;
    let mut run_len = 0usize;

    for (idx, ch) in text.char_indices() {
        if run_char == Some(ch) {
            run_len += 1;
        } else {
            flush_run(&mut out, text, run_start, idx, run_len, run_char);
            run_char = Some(ch);
            run_start = idx;
            run_len = 1;
        }
    }
    flush_run(&mut out, text, run_start, text.len(), run_len, run_char);

    out
}

fn flush_run(
    out: &mut String,
    text: &str,
    start: usize,
    end: usize,
    len: usize,
    ch: Option<char>,
) {
    let Some(ch) = ch else { return };
    if len >= 4 {
        out.push(ch);
        out.push(ch);
    } else {
        out.push_str(&text[start..end]);
    }
}
