//! Sentence-level BLEU against a single reference.

use std::collections::HashMap;
use std::hash::Hash;

/// How zero n-gram precisions above unigrams are treated.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Smoothing {
    /// Replace a zero precision by the smallest positive `f64`. A pair that
    /// shares at least one token keeps a tiny positive score.
    #[default]
    Floor,
    /// Add `epsilon` to the numerator of every zero precision.
    Epsilon(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BleuConfig {
    /// Highest n-gram order; orders 1..=max_ngram are weighted uniformly.
    pub max_ngram: usize,
    pub smoothing: Smoothing,
}

impl Default for BleuConfig {
    fn default() -> Self {
        Self {
            max_ngram: 4,
            smoothing: Smoothing::default(),
        }
    }
}

fn ngram_counts<T: Eq + Hash>(tokens: &[T], n: usize) -> HashMap<&[T], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Clipped n-gram matches and the hypothesis n-gram total (at least 1).
fn modified_precision<T: Eq + Hash>(reference: &[T], hypothesis: &[T], n: usize) -> (usize, usize) {
    let hyp_counts = ngram_counts(hypothesis, n);
    let ref_counts = ngram_counts(reference, n);

    let matches = hyp_counts
        .iter()
        .map(|(gram, &count)| count.min(ref_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    let total = hyp_counts.values().sum::<usize>().max(1);
    (matches, total)
}

fn brevity_penalty(ref_len: usize, hyp_len: usize) -> f64 {
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}

/// BLEU of `hypothesis` against the single `reference`, in `[0, 1]`.
///
/// Returns exactly 0 when no unigram of the hypothesis occurs in the
/// reference (this includes an empty hypothesis or reference).
pub fn sentence_bleu<T: Eq + Hash>(reference: &[T], hypothesis: &[T], config: &BleuConfig) -> f64 {
    let max_n = config.max_ngram.max(1);
    let precisions: Vec<(usize, usize)> = (1..=max_n)
        .map(|n| modified_precision(reference, hypothesis, n))
        .collect();

    if precisions[0].0 == 0 {
        return 0.0;
    }

    let bp = brevity_penalty(reference.len(), hypothesis.len());
    let weight = 1.0 / max_n as f64;

    let log_sum: f64 = precisions
        .iter()
        .map(|&(matches, total)| {
            let p = match (matches, config.smoothing) {
                (0, Smoothing::Floor) => f64::MIN_POSITIVE,
                (0, Smoothing::Epsilon(eps)) => eps / total as f64,
                (m, _) => m as f64 / total as f64,
            };
            weight * p.ln()
        })
        .sum();

    bp * log_sum.exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    fn bleu(reference: &str, hypothesis: &str) -> f64 {
        sentence_bleu(&toks(reference), &toks(hypothesis), &BleuConfig::default())
    }

    #[test]
    fn test_identical_sentences_score_one() {
        let s = bleu("the cat sat on the mat", "the cat sat on the mat");
        assert!((s - 1.0).abs() < 1e-12, "got {s}");
    }

    #[test]
    fn test_longer_hypothesis_no_penalty() {
        // p = 6/7, 5/6, 4/5, 3/4; BP = 1
        let s = bleu("the cat sat on the mat", "the cat sat on the mat today");
        assert!((s - 0.809_106_711_570_221_2).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_brevity_penalty() {
        // All precisions 1; BP = exp(1 - 6/5)
        let s = bleu("a b c d e f", "a b c d e");
        assert!((s - 0.818_730_753_077_981_8).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_no_unigram_match_is_zero() {
        assert_eq!(bleu("the cat sat", "猫 坐 着"), 0.0);
        assert_eq!(bleu("the cat sat", ""), 0.0);
        assert_eq!(bleu("", "the cat sat"), 0.0);
    }

    #[test]
    fn test_clipped_counts() {
        // "the" appears twice in the reference, seven times in the hypothesis.
        let (matches, total) =
            modified_precision(&toks("the cat is on the mat"), &toks("the the the the the the the"), 1);
        assert_eq!((matches, total), (2, 7));
    }

    #[test]
    fn test_floor_smoothing_keeps_tiny_positive() {
        let s = bleu("the cat", "the dog");
        assert!(s > 0.0);
        assert!(s < 1e-200);
    }

    #[test]
    fn test_epsilon_smoothing() {
        let config = BleuConfig {
            smoothing: Smoothing::Epsilon(0.1),
            ..BleuConfig::default()
        };
        // p = 1/2, 0.1/1, 0.1/1, 0.1/1
        let s = sentence_bleu(&toks("the cat"), &toks("the dog"), &config);
        assert!((s - 0.149_534_878_122_122_04).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn test_lower_max_ngram() {
        let config = BleuConfig {
            max_ngram: 1,
            ..BleuConfig::default()
        };
        // unigram precision 1/2, BP = 1
        let s = sentence_bleu(&toks("the cat"), &toks("the dog"), &config);
        assert!((s - 0.5).abs() < 1e-12, "got {s}");
    }

    #[test]
    fn test_score_in_unit_range() {
        let pairs = [
            ("a b c", "a b c d e f g"),
            ("a a a a", "a"),
            ("x y z w", "w z y x"),
        ];
        for (r, h) in pairs {
            let s = bleu(r, h);
            assert!((0.0..=1.0).contains(&s), "{r:?} vs {h:?} gave {s}");
        }
    }
}
