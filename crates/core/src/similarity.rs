use crate::error::StoreError;
use crate::models::{ChunkMetadata, SearchHit};
use std::sync::{PoisonError, RwLock};

/// Cosine similarity of two vectors.
///
/// Returns exactly `0.0` when either vector has zero norm or when the
/// dimensions differ: such pairs are treated as unrelated rather than as an
/// error. Accumulation happens in `f64`, so a non-zero vector compared with
/// itself scores exactly `1.0`.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0) as f32
}

#[derive(Debug, Default)]
struct Entries {
    vectors: Vec<Vec<f32>>,
    metadata: Vec<ChunkMetadata>,
}

/// Volatile exact-search index used when no remote index is reachable.
///
/// Vectors and metadata live in two parallel sequences behind one lock, so
/// index `i` in one always belongs to index `i` in the other.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<Entries>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &self,
        vectors: Vec<Vec<f32>>,
        metadata: Vec<ChunkMetadata>,
    ) -> Result<(), StoreError> {
        if vectors.len() != metadata.len() {
            return Err(StoreError::InputMismatch {
                vectors: vectors.len(),
                metadata: metadata.len(),
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.vectors.extend(vectors);
        entries.metadata.extend(metadata);
        Ok(())
    }

    /// Linear scan; ties keep insertion order.
    pub fn search(&self, query: &[f32], top_k: usize, threshold: f32) -> Vec<SearchHit> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);

        let mut scored: Vec<(usize, f32)> = entries
            .vectors
            .iter()
            .enumerate()
            .map(|(index, vector)| (index, cosine_similarity(query, vector)))
            .filter(|(_, similarity)| *similarity >= threshold)
            .collect();

        scored.sort_by(|left, right| right.1.total_cmp(&left.1));
        scored.truncate(top_k);

        scored
            .into_iter()
            .map(|(index, similarity)| SearchHit {
                metadata: entries.metadata[index].clone(),
                similarity,
            })
            .collect()
    }

    pub fn delete_all(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.vectors.clear();
        entries.metadata.clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .vectors
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
