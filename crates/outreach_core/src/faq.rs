//! crates/outreach_core/src/faq.rs
//!
//! Token-overlap matching of inbound messages against a user's FAQ list.

use std::collections::HashSet;

use crate::domain::Faq;

/// A score must be strictly greater than this to count as a match.
pub const MATCH_THRESHOLD: f64 = 0.3;

/// Tokens of this length or shorter never count as shared.
const MIN_SHARED_TOKEN_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct FaqMatch<'a> {
    pub faq: &'a Faq,
    pub score: f64,
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_string()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Similarity score in `[0, 1]`.
///
/// Equal texts (ignoring case and surrounding whitespace) score 1.0 and a text
/// containing the other scores 0.8. Otherwise the score is the number of shared
/// distinct tokens (length >= 3) divided by the longer token count. Blank input
/// always scores 0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 0.8;
    }

    let tokens_a = tokenize(&a);
    let tokens_b = tokenize(&b);
    let longest = tokens_a.len().max(tokens_b.len());
    if longest == 0 {
        return 0.0;
    }

    let set_b: HashSet<&str> = tokens_b.iter().map(String::as_str).collect();
    let shared = tokens_a
        .iter()
        .map(String::as_str)
        .filter(|token| token.chars().count() >= MIN_SHARED_TOKEN_LEN)
        .collect::<HashSet<&str>>()
        .into_iter()
        .filter(|token| set_b.contains(token))
        .count();

    shared as f64 / longest as f64
}

/// Best-scoring FAQ above the threshold. Ties keep the earliest entry.
pub fn find_matching_faq<'a>(message: &str, faqs: &'a [Faq]) -> Option<FaqMatch<'a>> {
    let mut best: Option<FaqMatch<'a>> = None;
    for faq in faqs {
        let score = similarity(message, &faq.question);
        if score <= MATCH_THRESHOLD {
            continue;
        }
        if best.as_ref().map_or(true, |current| score > current.score) {
            best = Some(FaqMatch { faq, score });
        }
    }
    best
}
