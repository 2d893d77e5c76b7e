//! Lexical similarity functions and text feature hashing
//!
//! All similarity functions return a score in [0.0, 1.0] where 1.0 means identical.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which lexical signal the reranker blends with the semantic score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LexicalMetric {
    /// Indel similarity of the whitespace tokens after sorting them
    #[default]
    TokenSort,
    /// Jaccard overlap of padded character trigrams
    Trigram,
}

impl std::str::FromStr for LexicalMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "token_sort" | "token-sort" => Ok(Self::TokenSort),
            "trigram" => Ok(Self::Trigram),
            other => Err(format!("unknown lexical metric '{}'", other)),
        }
    }
}

/// Calculate lexical similarity between two cleaned strings
pub fn lexical_similarity(a: &str, b: &str, metric: LexicalMetric) -> f32 {
    match metric {
        LexicalMetric::TokenSort => token_sort_ratio(a, b),
        LexicalMetric::Trigram => trigram_similarity(a, b),
    }
}

/// Token-order-insensitive edit similarity.
///
/// Tokens are sorted and re-joined with single spaces before the
/// comparison, so `"tomatoes cherry"` and `"cherry tomatoes"` score 1.0.
pub fn token_sort_ratio(a: &str, b: &str) -> f32 {
    indel_ratio(&sorted_tokens(a), &sorted_tokens(b))
}

/// Normalized Indel similarity: `2 * LCS / (len(a) + len(b))` over chars.
///
/// Two empty strings are identical (1.0); one empty side scores 0.0.
pub fn indel_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    (2 * lcs_len(&a, &b)) as f32 / total as f32
}

fn sorted_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Longest common subsequence length, two-row DP
fn lcs_len(a: &[char], b: &[char]) -> usize {
    // Keep the shorter side in the row.
    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; short.len() + 1];
    let mut curr = vec![0usize; short.len() + 1];

    for &lc in long {
        for (j, &sc) in short.iter().enumerate() {
            curr[j + 1] = if lc == sc {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[short.len()]
}

/// Calculate trigram similarity between two strings
///
/// Uses character trigrams for fuzzy text matching
pub fn trigram_similarity(a: &str, b: &str) -> f32 {
    let trigrams_a = generate_trigrams(&a.to_lowercase());
    let trigrams_b = generate_trigrams(&b.to_lowercase());

    if trigrams_a.is_empty() && trigrams_b.is_empty() {
        return 1.0;
    }

    if trigrams_a.is_empty() || trigrams_b.is_empty() {
        return 0.0;
    }

    let intersection = trigrams_a.intersection(&trigrams_b).count();
    let union = trigrams_a.union(&trigrams_b).count();

    if union == 0 {
        0.0
    } else {
        intersection as f32 / union as f32
    }
}

/// Generate character trigrams from a string
fn generate_trigrams(s: &str) -> HashSet<String> {
    if s.trim().is_empty() {
        return HashSet::new();
    }

    let padded = format!("  {}  ", s);
    let chars: Vec<char> = padded.chars().collect();

    chars.windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Feature hashed for text with no trigrams (empty or blank)
const EMPTY_TEXT_FEATURE: &str = "\u{0}empty";

/// Hash text into a fixed-size, L2-normalized feature vector.
///
/// Trigrams add 1.0 to their bucket and whole words add 2.0. Empty or
/// blank text maps to a single reserved feature, so every input gets a
/// unit vector. Buckets come from FNV-1a, so the output is identical
/// across builds and platforms and persisted vectors stay valid.
pub fn hash_text_to_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    if dim == 0 {
        return vector;
    }

    // Sorted so float accumulation order does not depend on set iteration.
    let mut trigrams: Vec<String> = generate_trigrams(text).into_iter().collect();
    if trigrams.is_empty() {
        vector[bucket(EMPTY_TEXT_FEATURE, dim)] = 1.0;
        return vector;
    }
    trigrams.sort_unstable();
    for trigram in &trigrams {
        vector[bucket(trigram, dim)] += 1.0;
    }

    for word in text.split_whitespace() {
        vector[bucket(word, dim)] += 2.0;
    }

    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
    }

    vector
}

fn bucket(feature: &str, dim: usize) -> usize {
    (fnv1a(feature.as_bytes()) % dim as u64) as usize
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ u64::from(b)).wrapping_mul(PRIME))
}
