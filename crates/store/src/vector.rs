//! Vector similarity lookup.
//!
//! Per §4.1: "Vector lookups (cosine similarity) are exposed as a separate
//! capability with configurable similarity threshold and top-K." Embeddings
//! are computed upstream (outside this crate's scope); this module only
//! ranks already-embedded candidates, keeping the store free of an ML
//! dependency.

#[derive(Debug, Clone)]
pub struct ScoredMatch<T> {
    pub item: T,
    pub similarity: f64,
}

pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Rank `candidates` against `query` by cosine similarity, keeping only
/// matches at or above `threshold`, returning at most `top_k`.
pub fn top_k_similar<T: Clone>(query: &[f64], candidates: &[(T, Vec<f64>)], threshold: f64, top_k: usize) -> Vec<ScoredMatch<T>> {
    let mut scored: Vec<ScoredMatch<T>> = candidates
        .iter()
        .map(|(item, vector)| ScoredMatch { item: item.clone(), similarity: cosine_similarity(query, vector) })
        .filter(|m| m.similarity >= threshold)
        .collect();
    scored.sort_by(|a, b| b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_similarity_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn orthogonal_vectors_have_similarity_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn top_k_respects_threshold_and_limit() {
        let query = vec![1.0, 0.0];
        let candidates = vec![
            ("a".to_string(), vec![1.0, 0.0]),
            ("b".to_string(), vec![0.9, 0.1]),
            ("c".to_string(), vec![0.0, 1.0]),
        ];
        let results = top_k_similar(&query, &candidates, 0.5, 1);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].item, "a");
    }
}
