//! Deterministic local embeddings via feature hashing.
//!
//! Token, bigram and character-trigram features are hashed into a fixed
//! 256-dimensional vector (sign taken from a hash bit) and L2-normalised.
//! Identical text always embeds to the identical vector, so similarity
//! search needs no external service and stays reproducible in tests.

use std::hash::{Hash, Hasher};

pub const EMBEDDING_DIM: usize = 256;

const TOKEN_WEIGHT: f32 = 1.0;
const BIGRAM_WEIGHT: f32 = 0.8;
const TRIGRAM_WEIGHT: f32 = 0.15;

/// Embed a text into a unit-length vector (all-zero for empty input)
pub fn embed(text: &str) -> Vec<f32> {
    let mut vec = vec![0.0f32; EMBEDDING_DIM];
    let normalized = text.to_lowercase();
    let tokens: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return vec;
    }

    for token in &tokens {
        add_feature(&mut vec, &format!("t:{token}"), TOKEN_WEIGHT);
    }
    for pair in tokens.windows(2) {
        add_feature(&mut vec, &format!("b:{}_{}", pair[0], pair[1]), BIGRAM_WEIGHT);
    }

    let compact: Vec<char> = normalized.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.len() >= 3 {
        for tri in compact.windows(3) {
            let trigram: String = tri.iter().collect();
            add_feature(&mut vec, &format!("c:{trigram}"), TRIGRAM_WEIGHT);
        }
    }

    let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vec {
            *v /= norm;
        }
    }
    vec
}

fn add_feature(vec: &mut [f32], feature: &str, weight: f32) {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    feature.hash(&mut hasher);
    let digest = hasher.finish();
    let idx = (digest as usize) % vec.len();
    let sign = if digest & (1 << 63) == 0 { 1.0 } else { -1.0 };
    vec[idx] += sign * weight;
}

/// Cosine similarity; 0.0 when lengths differ or either vector is zero
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let magnitude = (norm_a * norm_b).sqrt();
    if magnitude == 0.0 {
        0.0
    } else {
        dot / magnitude
    }
}

/// Encode a vector as little-endian f32 bytes for BLOB storage
pub fn to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a vector; trailing partial floats are dropped
pub fn from_blob(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_is_deterministic() {
        let a = embed("deploy the staging environment");
        let b = embed("deploy the staging environment");
        assert_eq!(a, b);
    }

    #[test]
    fn test_embed_dimension_and_norm() {
        let v = embed("kanban board limits");
        assert_eq!(v.len(), EMBEDDING_DIM);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_embed_empty_is_zero_vector() {
        let v = embed("");
        assert_eq!(v.len(), EMBEDDING_DIM);
        assert!(v.iter().all(|x| *x == 0.0));
        assert!(embed("   \t\n").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_self_similarity_is_one() {
        let v = embed("retry the failed webhook delivery");
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let query = embed("database connection pool settings");
        let related = embed("tuning the database connection pool");
        let unrelated = embed("birthday cake recipe with chocolate");
        assert!(
            cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
            "related text should outrank unrelated text"
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(embed("Deploy Staging"), embed("deploy staging"));
    }

    #[test]
    fn test_cosine_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let zero = vec![0.0f32; 4];
        let unit = vec![1.0f32, 0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&zero, &unit), 0.0);
    }

    #[test]
    fn test_blob_round_trip() {
        let v = embed("persist me");
        let blob = to_blob(&v);
        assert_eq!(blob.len(), EMBEDDING_DIM * 4);
        assert_eq!(from_blob(&blob), v);
    }

    #[test]
    fn test_blob_drops_trailing_bytes() {
        let decoded = from_blob(&[0, 0, 128, 63, 1, 2]);
        assert_eq!(decoded, vec![1.0]);
    }
}
