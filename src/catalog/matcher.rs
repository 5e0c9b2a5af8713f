//! Fuzzy product-name matching used by catalog imports.

use std::collections::BTreeSet;

/// Default similarity a name pair needs to be treated as the same product
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.85;

/// Lowercase, turn punctuation into spaces, collapse whitespace
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .flat_map(|c| {
            let mapped = if c.is_alphanumeric() { c } else { ' ' };
            mapped.to_lowercase()
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_set(name: &str) -> BTreeSet<String> {
    normalize_name(name)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Jaccard similarity of the two names' word sets, `|A ∩ B| / |A ∪ B|`.
///
/// Two empty names score 0 so blank rows never match anything.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let left = word_set(a);
    let right = word_set(b);
    if left.is_empty() && right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(&right).count() as f64;
    let union = left.union(&right).count() as f64;
    intersection / union
}

pub fn is_match(a: &str, b: &str, threshold: f64) -> bool {
    jaccard_similarity(a, b) >= threshold
}

/// Index of the most similar candidate at or above `threshold`.
///
/// Ties go to the earliest candidate.
pub fn best_match<'a, I>(name: &str, candidates: I, threshold: f64) -> Option<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.into_iter().enumerate() {
        let score = jaccard_similarity(name, candidate);
        if score < threshold {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best
}
