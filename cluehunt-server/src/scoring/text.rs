//! Text similarity over normalized strings

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normalize free text for comparison
///
/// Lowercases, decomposes (NFKD) and drops combining marks so accents vanish,
/// removes everything that is neither alphanumeric nor whitespace, then
/// collapses whitespace runs to single spaces and trims.
pub fn normalize_text(input: &str) -> String {
    let stripped: String = input
        .to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Edit-distance similarity of two answers after normalization
///
/// `1 - levenshtein(a, b) / max(len(a), len(b), 1)`, counted in chars.
/// Two strings that both normalize to empty are fully similar.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    strsim::normalized_levenshtein(&a, &b)
}
