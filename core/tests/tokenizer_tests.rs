use concord_core::tokenizer::{normalize, tokenize};

#[test]
fn it_normalizes_without_stemming() {
    let toks = tokenize("Running Runners RUN! The café's menu.");
    let words: Vec<String> = toks.into_iter().map(|(_, w, _)| w).collect();
    assert_eq!(words, vec!["running", "runners", "run", "the", "café's", "menu"]);
}

#[test]
fn it_keeps_stopwords_and_positions() {
    let toks = tokenize("The quick brown fox and the lazy dog");
    assert_eq!(toks.len(), 8);
    assert_eq!(toks[5], ("the".to_string(), "the".to_string(), 6));
}

#[test]
fn it_applies_compatibility_normalization() {
    // fullwidth letters and the "fi" ligature fold under NFKC
    assert_eq!(normalize("\u{ff27}\u{ff4f}\u{ff44}"), "god");
    assert_eq!(normalize("\u{fb01}rmament;"), "firmament");
}
