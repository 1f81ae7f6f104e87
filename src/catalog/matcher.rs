//! Token-sort fuzzy similarity on a 0-100 scale.
//!
//! Both strings are split on whitespace, their tokens sorted and re-joined,
//! and the result compared with an indel (insert/delete) similarity:
//! `200 * lcs / (len_a + len_b)`.

/// Sorted, space-joined tokens.
fn sort_tokens(text: &str) -> Vec<char> {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ").chars().collect()
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Indel similarity of two character sequences, 0-100.
pub fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

/// Index and score of the best candidate. The first candidate wins ties.
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S]) -> Option<(usize, f64)> {
    let query_tokens = sort_tokens(query);
    if query_tokens.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let score = ratio(&query_tokens, &sort_tokens(candidate.as_ref()));
        if best.is_none_or(|(_, s)| score > s) {
            best = Some((index, score));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings_score_100() {
        assert_eq!(token_sort_ratio("oracle helmet", "oracle helmet"), 100.0);
    }

    #[test]
    fn test_token_order_is_ignored() {
        assert_eq!(token_sort_ratio("helmet oracle", "oracle helmet"), 100.0);
    }

    #[test]
    fn test_partial_name_scores_above_threshold() {
        // 13 of 19 characters in common: 2*13/32
        let score = token_sort_ratio("oracle helmet", "oracle helmet black");
        assert!((score - 81.25).abs() < 1e-9);
    }

    #[test]
    fn test_unrelated_strings_score_low() {
        assert!(token_sort_ratio("paladin helmet", "xqzv") < 40.0);
    }

    #[test]
    fn test_best_match_prefers_first_on_ties() {
        let candidates = ["abcd", "abcd", "zzzz"];
        assert_eq!(best_match("abcd", &candidates), Some((0, 100.0)));
        assert_eq!(best_match("   ", &candidates), None);
    }

    #[test]
    fn test_lcs() {
        let a: Vec<char> = "ORC-mkX".chars().collect();
        let b: Vec<char> = "0RC-mkX".chars().collect();
        assert_eq!(lcs_len(&a, &b), 6);
    }
}
