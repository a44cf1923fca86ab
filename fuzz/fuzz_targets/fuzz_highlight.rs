#![no_main]

use arbitrary::Arbitrary;
use axi::analysis::NormalizingAnalyzer;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    text: String,
    matched: Vec<String>,
    prefix: Option<String>,
}

fuzz_target!(|input: Input| {
    // Highlighting arbitrary display text against arbitrary query tokens
    // must not panic, and must preserve the text outside the brackets.
    let highlighted = axi::suggest::highlight(
        &input.text,
        &input.matched,
        input.prefix.as_deref(),
        &NormalizingAnalyzer,
    )
    .expect("built-in analyzer never fails");

    let stripped: String = highlighted.chars().filter(|c| *c != '[' && *c != ']').collect();
    let original: String = input.text.chars().filter(|c| *c != '[' && *c != ']').collect();
    assert_eq!(stripped, original);
});
