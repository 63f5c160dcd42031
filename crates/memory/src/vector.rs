//! Vector similarity utilities.

use agora_core::memory::Document;

/// Compute cosine similarity between two vectors.
///
/// Returns a value in [-1, 1] where 1 = identical, 0 = orthogonal, -1 = opposite.
/// Returns 0.0 if either vector is zero-length or empty.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < 1e-10 {
        return 0.0;
    }

    (dot / denom) as f32
}

/// Rank documents by cosine distance (`1 - similarity`) to a query embedding.
///
/// Returns at most `limit` documents, nearest first, with `distance` set.
/// Documents without an embedding of the query's dimension are skipped.
pub fn rank_by_distance(
    documents: &[Document],
    query_embedding: &[f32],
    limit: usize,
) -> Vec<Document> {
    let mut scored: Vec<(f32, &Document)> = documents
        .iter()
        .filter_map(|doc| {
            let emb = doc.embedding.as_ref()?;
            if emb.len() != query_embedding.len() {
                return None;
            }
            Some((1.0 - cosine_similarity(emb, query_embedding), doc))
        })
        .collect();

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);
    scored
        .into_iter()
        .map(|(distance, doc)| {
            let mut doc = doc.clone();
            doc.distance = Some(distance);
            doc
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, embedding: Option<Vec<f32>>) -> Document {
        Document {
            id: id.into(),
            content: format!("Content for {id}"),
            embedding,
            metadata: Default::default(),
            distance: None,
        }
    }

    #[test]
    fn cosine_identical_vectors() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_opposite_vectors() {
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn cosine_known_value() {
        // similarity = 1 / sqrt(2)
        let sim = cosine_similarity(&[1.0, 1.0], &[1.0, 0.0]);
        assert!((sim - 0.7071).abs() < 0.001);
    }

    #[test]
    fn ranks_nearest_first_with_distance() {
        let query = vec![1.0, 0.0, 0.0];
        let docs = vec![
            doc("a", Some(vec![0.0, 1.0, 0.0])), // distance 1
            doc("b", Some(vec![1.0, 0.0, 0.0])), // distance 0
            doc("c", Some(vec![0.5, 0.5, 0.0])), // distance ~0.29
        ];

        let ranked = rank_by_distance(&docs, &query, 10);
        let ids: Vec<_> = ranked.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
        assert!(ranked[0].distance.unwrap().abs() < 1e-6);
        assert!((ranked[2].distance.unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn skips_missing_and_mismatched_embeddings() {
        let query = vec![1.0, 0.0];
        let docs = vec![
            doc("a", Some(vec![1.0, 0.0])),
            doc("b", None),
            doc("c", Some(vec![1.0, 0.0, 0.0])),
        ];

        let ranked = rank_by_distance(&docs, &query, 10);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, "a");
    }

    #[test]
    fn respects_limit() {
        let query = vec![1.0, 0.0];
        let docs: Vec<_> = (0..10)
            .map(|i| doc(&format!("e{i}"), Some(vec![1.0, i as f32 * 0.1])))
            .collect();
        assert_eq!(rank_by_distance(&docs, &query, 3).len(), 3);
        assert!(rank_by_distance(&docs, &query, 0).is_empty());
    }
}
