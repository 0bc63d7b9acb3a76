//! String and set similarity scoring
//!
//! Small, allocation-light scoring primitives used by the alt detector.
//! Display names in session logs are short, so the plain dynamic-programming
//! edit distance is fast enough.

use std::collections::HashSet;
use std::hash::Hash;

/// Case-insensitive normalized edit-distance ratio in [0, 1]
///
/// `1 - distance / max(len)`, computed over characters. Equal strings
/// (ignoring case) score 1.0; either side empty scores 0.0.
pub fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let s1: Vec<char> = a.to_lowercase().chars().collect();
    let s2: Vec<char> = b.to_lowercase().chars().collect();
    if s1 == s2 {
        return 1.0;
    }
    let dist = levenshtein(&s1, &s2);
    1.0 - dist as f64 / s1.len().max(s2.len()) as f64
}

/// Jaccard index in [0, 1]; two empty sets score 1.0 by convention
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Classic two-row Levenshtein over char slices
fn levenshtein(s1: &[char], s2: &[char]) -> usize {
    let mut prev: Vec<usize> = (0..=s2.len()).collect();
    let mut curr = vec![0usize; s2.len() + 1];

    for (i, c1) in s1.iter().enumerate() {
        curr[0] = i + 1;
        for (j, c2) in s2.iter().enumerate() {
            let cost = usize::from(c1 != c2);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[s2.len()]
}
