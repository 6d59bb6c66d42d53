//! Text-similarity oracle.
//!
//! The interpreter never compares identifier strings directly; every fuzzy
//! decision goes through a [`SimilarityOracle`] that maps text to a vector
//! and scores vector pairs by cosine. The oracle is injected everywhere it
//! is needed (never a hidden singleton), so tests can substitute a
//! deterministic fake and alignment stays reproducible.
//!
//! The default [`TokenBundleOracle`] bundles deterministic token vectors:
//! each lowercased token is hashed to a seed, expanded to a bipolar vector,
//! and summed together with adjacent-pair vectors that preserve word order.
//! The same text always produces the same embedding, on every run.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use unicode_normalization::UnicodeNormalization;

/// A dense text embedding. Compared by cosine, so magnitude is irrelevant.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.0.len()
    }

    /// An embedding with no signal; similar to nothing (cosine 0).
    pub fn zero(dim: usize) -> Self {
        Embedding(vec![0.0; dim])
    }
}

/// Black-box text-similarity function.
///
/// `encode` must be deterministic for a fixed input; `similarity` returns a
/// score in [-1, 1].
pub trait SimilarityOracle: Send + Sync {
    fn encode(&self, text: &str) -> Embedding;

    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        cosine(&a.0, &b.0)
    }
}

/// Cosine similarity; 0.0 when either vector has no magnitude.
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for i in 0..n {
        dot += a[i] * b[i];
        na += a[i] * a[i];
        nb += b[i] * b[i];
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

/// Default embedding dimension. High enough that unrelated token vectors are
/// near-orthogonal (residual cosine on the order of 1/sqrt(dim)).
pub const DEFAULT_DIM: usize = 4096;

/// Deterministic bag-of-tokens embedder with order-sensitive pair features.
#[derive(Debug, Clone)]
pub struct TokenBundleOracle {
    dim: usize,
}

impl TokenBundleOracle {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// NFKC-normalize, lowercase, and split on non-alphanumeric runs.
    fn tokenize(text: &str) -> Vec<String> {
        let normalized: String = text.nfkc().collect::<String>().to_lowercase();
        normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Deterministic bipolar vector for one feature string.
    fn feature_vector(&self, feature: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        feature.hash(&mut hasher);
        let mut rng = StdRng::seed_from_u64(hasher.finish());
        (0..self.dim)
            .map(|_| if rng.r#gen::<bool>() { 1.0 } else { -1.0 })
            .collect()
    }
}

impl Default for TokenBundleOracle {
    fn default() -> Self {
        Self::new(DEFAULT_DIM)
    }
}

impl SimilarityOracle for TokenBundleOracle {
    fn encode(&self, text: &str) -> Embedding {
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return Embedding::zero(self.dim);
        }

        let mut acc = vec![0.0f32; self.dim];
        let mut add = |feature: &str| {
            for (slot, x) in acc.iter_mut().zip(self.feature_vector(feature)) {
                *slot += x;
            }
        };

        for token in &tokens {
            add(token);
        }
        // Adjacent pairs carry word order, which plain bags cannot see.
        for pair in tokens.windows(2) {
            add(&format!("{} {}", pair[0], pair[1]));
        }

        Embedding(acc)
    }
}

/// Find the `top_k` best-scoring candidates for a target embedding.
///
/// Returns the candidate keys in descending score order, or `None` when the
/// k-th best score falls below `threshold` (an all-or-nothing contract,
/// matching how callers consume ranked candidate sets). Ties keep the
/// first-seen candidate first: the sort is stable and comparisons are strict.
pub fn best_matches<K: Clone>(
    oracle: &dyn SimilarityOracle,
    target: &Embedding,
    candidates: &[(K, Embedding)],
    threshold: f32,
    top_k: usize,
) -> Option<Vec<K>> {
    if candidates.is_empty() || top_k == 0 {
        return None;
    }
    let mut scored: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(i, (_, emb))| (i, oracle.similarity(target, emb)))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let k = top_k.min(scored.len());
    let least_best = scored[k - 1].1;
    if least_best < threshold {
        return None;
    }
    Some(
        scored[..k]
            .iter()
            .map(|&(i, _)| candidates[i].0.clone())
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle() -> TokenBundleOracle {
        TokenBundleOracle::new(1024)
    }

    #[test]
    fn encoding_is_deterministic() {
        let o = oracle();
        assert_eq!(o.encode("has source participant"), o.encode("has source participant"));
    }

    #[test]
    fn case_and_separators_do_not_matter() {
        let o = oracle();
        let a = o.encode("has Source Participant");
        let b = o.encode("has source participant");
        let sim = o.similarity(&a, &b);
        assert!((sim - 1.0).abs() < 1e-6, "sim={sim}");
    }

    #[test]
    fn unrelated_phrases_are_dissimilar() {
        let o = oracle();
        let a = o.encode("has source participant");
        let b = o.encode("membrane voltage");
        let sim = o.similarity(&a, &b);
        assert!(sim.abs() < 0.2, "sim={sim}");
    }

    #[test]
    fn shared_words_raise_similarity_below_identity() {
        let o = oracle();
        let source = o.encode("has source participant");
        let sink = o.encode("has sink participant");
        let sim = o.similarity(&source, &sink);
        assert!(sim > 0.2 && sim < 0.9, "sim={sim}");
    }

    #[test]
    fn word_order_matters() {
        let o = oracle();
        let ab = o.encode("glucose transport");
        let ba = o.encode("transport glucose");
        let sim = o.similarity(&ab, &ba);
        assert!(sim < 0.999, "sim={sim}");
    }

    #[test]
    fn empty_text_is_similar_to_nothing() {
        let o = oracle();
        let empty = o.encode("  ");
        let other = o.encode("glucose");
        assert_eq!(o.similarity(&empty, &other), 0.0);
    }

    #[test]
    fn best_matches_ranks_and_thresholds() {
        let o = oracle();
        let target = o.encode("glucose transport across the membrane");
        let candidates = vec![
            ("unrelated", o.encode("sodium channel gating")),
            ("exact", o.encode("glucose transport across the membrane")),
        ];
        let best = best_matches(&o, &target, &candidates, 0.55, 1).unwrap();
        assert_eq!(best, vec!["exact"]);

        // All-or-nothing: asking for both fails because the worst is below threshold.
        assert!(best_matches(&o, &target, &candidates, 0.55, 2).is_none());
    }

    #[test]
    fn best_matches_empty_candidates_is_none() {
        let o = oracle();
        let target = o.encode("anything");
        let empty: Vec<(&str, Embedding)> = vec![];
        assert!(best_matches(&o, &target, &empty, 0.1, 1).is_none());
    }
}
