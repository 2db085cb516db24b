//! Cosine similarity and best-match selection over the live cache set

/// A cache entry eligible for the semantic scan.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub prompt: String,
    pub response: String,
    /// Absent when the sibling embedding key expired or was never stored.
    pub embedding: Option<Vec<f32>>,
}

/// Best match found by a semantic scan.
#[derive(Debug, Clone)]
pub struct SemanticMatch {
    pub prompt: String,
    pub response: String,
    pub similarity: f32,
}

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Zero-norm or mismatched-length inputs yield 0.0 (cosine is undefined; the
/// entry is effectively unmatched).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Linear scan for the entry most similar to `query`.
///
/// Returns the maximum-similarity entry iff its similarity is at least
/// `threshold`. Entries without embeddings are skipped. Ties resolve to the
/// first entry seen in scan order.
pub fn best_match(
    query: &[f32],
    entries: &[CachedEntry],
    threshold: f32,
) -> Option<SemanticMatch> {
    let mut best: Option<(usize, f32)> = None;

    for (idx, entry) in entries.iter().enumerate() {
        let Some(embedding) = &entry.embedding else {
            continue;
        };

        let similarity = cosine_similarity(query, embedding);
        match best {
            Some((_, best_similarity)) if similarity <= best_similarity => {}
            _ => best = Some((idx, similarity)),
        }
    }

    best.filter(|(_, similarity)| *similarity >= threshold)
        .map(|(idx, similarity)| SemanticMatch {
            prompt: entries[idx].prompt.clone(),
            response: entries[idx].response.clone(),
            similarity,
        })
}
