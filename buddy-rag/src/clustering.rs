//! Embedding-space clustering used to pick diverse chunks for a summary.
//!
//! K-means with farthest-point seeding is fully deterministic: the first
//! chunk seeds the first centroid and ties always go to the lowest index, so
//! the same embeddings always yield the same representatives.

use tracing::debug;

use crate::document::Chunk;
use crate::error::{RagError, Result};

const DEFAULT_MAX_ITERATIONS: usize = 100;

/// How many clusters to request for a document of `doc_length` chunks.
///
/// `clamp(doc_length / 5, 3, 10)`; for documents shorter than that, reduced
/// to `max(2, doc_length / 2)` and never more than `doc_length`.
pub fn cluster_count(doc_length: usize) -> usize {
    let count = (doc_length / 5).clamp(3, 10);
    if doc_length < count { (doc_length / 2).max(2).min(doc_length) } else { count }
}

/// A group of chunks with similar embeddings.
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    /// Indices into the clustered slice, ascending.
    pub members: Vec<usize>,
    /// Mean of the member embeddings.
    pub centroid: Vec<f32>,
    /// The member closest to the centroid.
    pub representative: usize,
}

/// Groups embedded chunks and keeps one representative per group.
///
/// # Example
///
/// ```rust,ignore
/// use buddy_rag::{ClusteringFilter, cluster_count};
///
/// let selected = ClusteringFilter::new().select(&chunks, cluster_count(chunks.len()))?;
/// ```
#[derive(Debug, Clone)]
pub struct ClusteringFilter {
    max_iterations: usize,
    preserve_document_order: bool,
}

impl Default for ClusteringFilter {
    fn default() -> Self {
        Self { max_iterations: DEFAULT_MAX_ITERATIONS, preserve_document_order: false }
    }
}

impl ClusteringFilter {
    /// A filter returning representatives in cluster order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the number of Lloyd iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// Return representatives in source order rather than cluster order.
    pub fn with_preserve_document_order(mut self, preserve: bool) -> Self {
        self.preserve_document_order = preserve;
        self
    }

    /// Run k-means over `embeddings`.
    ///
    /// `num_clusters` is capped at the number of points. Clusters that end
    /// up empty are dropped, so fewer than `num_clusters` may come back when
    /// points coincide.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if an embedding is empty or the
    /// dimensions disagree.
    pub fn cluster(&self, embeddings: &[&[f32]], num_clusters: usize) -> Result<Vec<Cluster>> {
        let Some(first) = embeddings.first() else {
            return Ok(Vec::new());
        };
        let dim = first.len();
        if let Some(i) = embeddings.iter().position(|e| e.is_empty() || e.len() != dim) {
            return Err(RagError::PipelineError(format!(
                "chunk {i} has an embedding of dimension {} (expected {dim})",
                embeddings[i].len()
            )));
        }
        if num_clusters == 0 {
            return Ok(Vec::new());
        }

        let mut centroids = seed_centroids(embeddings, num_clusters.min(embeddings.len()));
        let k = centroids.len();
        let mut assignments: Vec<usize> = embeddings.iter().map(|e| nearest(e, &centroids)).collect();

        for _ in 0..self.max_iterations {
            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0usize; k];
            for (embedding, &c) in embeddings.iter().zip(&assignments) {
                counts[c] += 1;
                for (sum, value) in sums[c].iter_mut().zip(embedding.iter()) {
                    *sum += value;
                }
            }
            for c in 0..k {
                if counts[c] > 0 {
                    centroids[c] = sums[c].iter().map(|s| s / counts[c] as f32).collect();
                }
            }

            let next: Vec<usize> = embeddings.iter().map(|e| nearest(e, &centroids)).collect();
            if next == assignments {
                break;
            }
            assignments = next;
        }

        let mut clusters = Vec::with_capacity(k);
        for (c, centroid) in centroids.into_iter().enumerate() {
            let members: Vec<usize> =
                (0..embeddings.len()).filter(|&i| assignments[i] == c).collect();
            let Some(representative) = members.iter().copied().min_by(|&a, &b| {
                squared_distance(embeddings[a], &centroid)
                    .total_cmp(&squared_distance(embeddings[b], &centroid))
                    .then(a.cmp(&b))
            }) else {
                continue;
            };
            clusters.push(Cluster { members, centroid, representative });
        }
        Ok(clusters)
    }

    /// Pick one representative chunk per cluster.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::PipelineError`] if any chunk lacks an embedding or
    /// the embedding dimensions disagree.
    pub fn select(&self, chunks: &[Chunk], num_clusters: usize) -> Result<Vec<Chunk>> {
        if let Some(chunk) = chunks.iter().find(|c| !c.is_embedded()) {
            return Err(RagError::PipelineError(format!(
                "chunk '{}' has no embedding and cannot be clustered",
                chunk.id
            )));
        }
        let embeddings: Vec<&[f32]> = chunks.iter().map(|c| c.embedding.as_slice()).collect();
        let clusters = self.cluster(&embeddings, num_clusters)?;

        let mut representatives: Vec<usize> = clusters.iter().map(|c| c.representative).collect();
        if self.preserve_document_order {
            representatives.sort_unstable();
        }
        debug!(
            chunk_count = chunks.len(),
            requested = num_clusters,
            cluster_count = clusters.len(),
            "selected cluster representatives"
        );
        Ok(representatives.into_iter().map(|i| chunks[i].clone()).collect())
    }
}

/// Farthest-point seeding: start from the first point, then repeatedly add
/// the point farthest from every chosen centroid. Stops early once every
/// remaining point coincides with a centroid.
fn seed_centroids(embeddings: &[&[f32]], k: usize) -> Vec<Vec<f32>> {
    let mut centroids = vec![embeddings[0].to_vec()];
    let mut min_distance: Vec<f32> =
        embeddings.iter().map(|e| squared_distance(e, &centroids[0])).collect();

    while centroids.len() < k {
        let mut best = 0;
        for (i, &d) in min_distance.iter().enumerate() {
            if d > min_distance[best] {
                best = i;
            }
        }
        if min_distance[best] <= 0.0 {
            break;
        }
        let centroid = embeddings[best].to_vec();
        for (d, e) in min_distance.iter_mut().zip(embeddings) {
            *d = d.min(squared_distance(e, &centroid));
        }
        centroids.push(centroid);
    }
    centroids
}

fn nearest(embedding: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_distance = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let d = squared_distance(embedding, centroid);
        if d < best_distance {
            best = c;
            best_distance = d;
        }
    }
    best
}

fn squared_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: format!("doc_{index}"),
            text: format!("chunk {index}"),
            embedding,
            document_id: "doc".into(),
            source: "doc.txt".into(),
            page: 1,
            index,
            start: 0,
        }
    }

    #[test]
    fn cluster_count_table() {
        assert_eq!(cluster_count(0), 0);
        assert_eq!(cluster_count(1), 1);
        assert_eq!(cluster_count(2), 2);
        assert_eq!(cluster_count(3), 3);
        assert_eq!(cluster_count(4), 3);
        assert_eq!(cluster_count(5), 3);
        assert_eq!(cluster_count(20), 4);
        assert_eq!(cluster_count(50), 10);
        assert_eq!(cluster_count(500), 10);
    }

    #[test]
    fn separates_well_spaced_groups() {
        let points: Vec<Vec<f32>> = vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.1, 0.0],
            vec![10.0, 10.2],
            vec![-5.0, 8.0],
            vec![-5.1, 8.0],
        ];
        let refs: Vec<&[f32]> = points.iter().map(Vec::as_slice).collect();
        let clusters = ClusteringFilter::new().cluster(&refs, 3).unwrap();
        let mut groups: Vec<Vec<usize>> = clusters.iter().map(|c| c.members.clone()).collect();
        groups.sort();
        assert_eq!(groups, vec![vec![0, 2], vec![1, 3], vec![4, 5]]);
        for cluster in &clusters {
            assert!(cluster.members.contains(&cluster.representative));
        }
    }

    #[test]
    fn coincident_points_collapse_into_fewer_clusters() {
        let points = [vec![1.0f32, 1.0], vec![1.0, 1.0], vec![1.0, 1.0]];
        let refs: Vec<&[f32]> = points.iter().map(Vec::as_slice).collect();
        let clusters = ClusteringFilter::new().cluster(&refs, 3).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].representative, 0);
    }

    #[test]
    fn select_is_deterministic_and_can_preserve_order() {
        let chunks = vec![
            chunk(0, vec![0.0, 0.0]),
            chunk(1, vec![10.0, 0.0]),
            chunk(2, vec![0.0, 10.0]),
        ];
        let filter = ClusteringFilter::new();
        let first = filter.select(&chunks, 3).unwrap();
        let second = filter.select(&chunks, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        let ordered = filter.with_preserve_document_order(true).select(&chunks, 3).unwrap();
        let indices: Vec<usize> = ordered.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn requesting_more_clusters_than_chunks_is_capped() {
        let chunks = vec![chunk(0, vec![0.0]), chunk(1, vec![1.0])];
        assert_eq!(ClusteringFilter::new().select(&chunks, 10).unwrap().len(), 2);
    }

    #[test]
    fn missing_embeddings_are_rejected() {
        let chunks = vec![chunk(0, vec![1.0]), chunk(1, Vec::new())];
        assert!(matches!(
            ClusteringFilter::new().select(&chunks, 2),
            Err(RagError::PipelineError(_))
        ));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let chunks = vec![chunk(0, vec![1.0, 0.0]), chunk(1, vec![1.0])];
        assert!(matches!(
            ClusteringFilter::new().select(&chunks, 2),
            Err(RagError::PipelineError(_))
        ));
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(ClusteringFilter::new().select(&[], 3).unwrap().is_empty());
    }
}
