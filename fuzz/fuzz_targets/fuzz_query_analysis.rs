#![no_main]

use axi::analysis::NormalizingAnalyzer;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Query analysis over arbitrary strings must not panic, and its
    // structural invariants must hold.
    let analysis = axi::query::QueryAnalysis::parse(data, &NormalizingAnalyzer);

    if let Some(prefix) = &analysis.prefix_token {
        assert!(!analysis.matched_tokens.contains(prefix));
    }

    let expected = analysis.matched_tokens.len().saturating_sub(1)
        + usize::from(
            analysis
                .prefix_token
                .as_deref()
                .is_some_and(|p| !p.trim().is_empty()),
        );
    assert_eq!(analysis.concatenations.len(), expected);

    let _ = axi::query::clean_repetitions(data);
});
