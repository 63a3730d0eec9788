use unicode_normalization::UnicodeNormalization;

/// Canonicalizes raw sentence text before clustering.
///
/// - Unicode normalize (NFKC)
/// - Trim leading/trailing whitespace
/// - Collapse runs of whitespace to single spaces
///
/// Sentences that come out empty are dropped by the caller.
pub fn normalize_text(text: &str) -> String {
    let normalized: String = text.nfkc().collect();
    normalized.split_whitespace().collect::<Vec<_>>().join(" ")
}
