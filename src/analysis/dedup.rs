//! Duplicate-token suppression for a single field occurrence.

use crate::analysis::analyzer::Token;
use ahash::AHashSet;

/// Empty out repeated tokens, keeping the first occurrence.
///
/// Duplicates are blanked rather than removed so downstream position
/// counting stays aligned with the token stream. The seen set lives for one
/// call only, i.e. one field occurrence.
pub fn dedup_tokens(tokens: &mut [Token]) {
    let mut seen: AHashSet<String> = AHashSet::with_capacity(tokens.len());
    for token in tokens.iter_mut() {
        if !seen.insert(token.text.clone()) {
            token.text.clear();
        }
    }
}
