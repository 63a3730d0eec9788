//! Greedy threshold clustering over sentence embeddings.
//!
//! Deterministic for identical (items, config): stable ascending iteration,
//! an explicit first-index tie-break for seeds, and a stable final ordering.

use anyhow::Result;
use std::collections::BTreeSet;
use tracing::info;

use crate::config::AppConfig;
use crate::embedding::EmbeddingClient;
use crate::pipeline::SentenceItem;
use crate::TARGET_PIPELINE;

/// Non-overlapping sentence cluster. `member_indices` index into the input
/// items (ascending); `comment_ids` is the deduplicated, sorted view of the
/// members' comment ids. `is_other` marks the synthetic overflow cluster so
/// downstream eligibility checks never infer it from position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInternal {
    pub member_indices: Vec<usize>,
    pub comment_ids: Vec<String>,
    pub is_other: bool,
}

impl ClusterInternal {
    pub fn new(member_indices: Vec<usize>, comment_ids: Vec<String>) -> Self {
        ClusterInternal {
            member_indices,
            comment_ids,
            is_other: false,
        }
    }
}

/// Pairwise cosine similarities. Embeddings are unit-normalized, so cosine
/// similarity is the dot product; values are clamped to [-1, 1] against
/// floating-point drift.
pub fn cosine_similarity_matrix(embeddings: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let n = embeddings.len();
    let mut sim = vec![vec![0.0f32; n]; n];
    for i in 0..n {
        for j in i..n {
            let dot: f32 = embeddings[i]
                .iter()
                .zip(embeddings[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            let value = dot.clamp(-1.0, 1.0);
            sim[i][j] = value;
            sim[j][i] = value;
        }
    }
    sim
}

#[derive(Debug, Clone, Copy)]
pub struct GreedyThresholdClusterer<'a> {
    pub config: &'a AppConfig,
}

impl GreedyThresholdClusterer<'_> {
    /// Partitions the input sentences into similarity clusters.
    ///
    /// While unassigned sentences remain and the cluster cap is not hit:
    /// pick the unassigned sentence with the highest total similarity to
    /// all unassigned sentences (ties resolve to the smallest index) as
    /// seed, and group every unassigned sentence at or above the threshold
    /// with it. Once the cap is reached, leftovers become singletons. The
    /// returned clusters partition `0..items.len()` exactly.
    pub async fn cluster(
        &self,
        items: &[SentenceItem],
        embedder: &EmbeddingClient,
    ) -> Result<Vec<ClusterInternal>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            target: TARGET_PIPELINE,
            "Clustering {} sentences (threshold {}, max {})",
            items.len(),
            self.config.cluster_similarity_threshold,
            self.config.cluster_max_clusters
        );

        let texts: Vec<String> = items.iter().map(|it| it.text.clone()).collect();
        let embeddings = embedder.embed(&texts).await?;
        let sim = cosine_similarity_matrix(&embeddings);

        let mut remaining: BTreeSet<usize> = (0..items.len()).collect();
        let mut clusters: Vec<ClusterInternal> = Vec::new();

        while !remaining.is_empty() && clusters.len() < self.config.cluster_max_clusters {
            // Most central remaining sentence; ascending scan with a strict
            // comparison keeps the smallest index on ties.
            let mut seed = *remaining.iter().next().expect("remaining is non-empty");
            let mut best = f32::NEG_INFINITY;
            for &i in &remaining {
                let score: f32 = remaining.iter().map(|&j| sim[i][j]).sum();
                if score > best {
                    best = score;
                    seed = i;
                }
            }

            let mut members: Vec<usize> = remaining
                .iter()
                .copied()
                .filter(|&j| sim[seed][j] >= self.config.cluster_similarity_threshold)
                .collect();
            if members.is_empty() {
                // Zero-magnitude embeddings never reach a positive
                // threshold, not even against themselves; the seed becomes
                // a singleton so the loop always makes progress.
                members = vec![seed];
            }
            for &j in &members {
                remaining.remove(&j);
            }

            let comment_ids = dedup_sorted_ids(items, &members);
            clusters.push(ClusterInternal::new(members, comment_ids));
        }

        // Cap was hit; everything left becomes a singleton, ascending.
        for i in remaining {
            let comment_ids = vec![items[i].comment_id.clone()];
            clusters.push(ClusterInternal::new(vec![i], comment_ids));
        }

        clusters.sort_by(|a, b| {
            b.member_indices
                .len()
                .cmp(&a.member_indices.len())
                .then_with(|| a.comment_ids[0].cmp(&b.comment_ids[0]))
        });

        info!(target: TARGET_PIPELINE, "Formed {} clusters", clusters.len());
        Ok(clusters)
    }
}

fn dedup_sorted_ids(items: &[SentenceItem], members: &[usize]) -> Vec<String> {
    let mut ids: Vec<String> = members
        .iter()
        .map(|&j| items[j].comment_id.clone())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::embedding::{EmbeddingClient, TfidfEmbedder};
    use crate::pipeline::Source;

    fn item(text: &str, comment_id: &str) -> SentenceItem {
        SentenceItem {
            text: text.to_string(),
            comment_id: comment_id.to_string(),
            source: Source::Baseline,
        }
    }

    fn tfidf_client() -> EmbeddingClient {
        EmbeddingClient::Tfidf(TfidfEmbedder {
            max_features: None,
            ngram_range: (1, 1),
        })
    }

    fn assert_partition(clusters: &[ClusterInternal], n: usize) {
        let mut seen: Vec<usize> = clusters
            .iter()
            .flat_map(|c| c.member_indices.iter().copied())
            .collect();
        seen.sort();
        assert_eq!(seen, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn cosine_matrix_is_symmetric_with_unit_diagonal() {
        let emb = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let sim = cosine_similarity_matrix(&emb);
        assert_eq!(sim[0][0], 1.0);
        assert_eq!(sim[0][1], 0.0);
        assert_eq!(sim[1][0], sim[0][1]);
        assert_eq!(sim[0][2], 1.0);
    }

    #[tokio::test]
    async fn empty_input_clusters_to_nothing() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let clusters = clusterer.cluster(&[], &tfidf_client()).await.unwrap();
        assert!(clusters.is_empty());
    }

    #[tokio::test]
    async fn clusters_partition_all_indices() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let items = vec![
            item("refund still pending", "c1"),
            item("refund still pending", "c2"),
            item("the app crashes on login", "c3"),
            item("dark mode looks great", "c4"),
        ];
        let clusters = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        assert_partition(&clusters, items.len());
        for c in &clusters {
            assert!(!c.member_indices.is_empty());
            assert!(!c.is_other);
        }
    }

    #[tokio::test]
    async fn identical_sentences_share_a_cluster() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let items = vec![
            item("checkout button is broken", "c1"),
            item("checkout button is broken", "c2"),
            item("totally unrelated topic here", "c3"),
        ];
        let clusters = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        let first = &clusters[0];
        assert_eq!(first.member_indices, vec![0, 1]);
        assert_eq!(first.comment_ids, vec!["c1".to_string(), "c2".to_string()]);
    }

    #[tokio::test]
    async fn clustering_is_deterministic() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let items = vec![
            item("slow shipping again", "c1"),
            item("shipping is slow", "c2"),
            item("support was helpful", "c3"),
            item("support answered fast", "c4"),
            item("price went up", "c5"),
        ];
        let a = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        let b = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn cap_turns_leftovers_into_singletons() {
        let mut cfg = test_config();
        cfg.cluster_max_clusters = 2;
        // Max threshold: only identical-direction vectors group
        cfg.cluster_similarity_threshold = 1.0;
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let items = vec![
            item("alpha one", "c1"),
            item("beta two", "c2"),
            item("gamma three", "c3"),
            item("delta four", "c4"),
        ];
        let clusters = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        assert_partition(&clusters, items.len());
        assert_eq!(clusters.len(), 4);
        assert!(clusters.iter().all(|c| c.member_indices.len() == 1));
    }

    #[tokio::test]
    async fn tokenless_sentences_become_singletons() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        // No token survives tokenization, so embeddings are zero-width and
        // similarity is zero everywhere.
        let items = vec![item("!!", "c1"), item("??", "c2")];
        let clusters = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        assert_partition(&clusters, 2);
        assert_eq!(clusters.len(), 2);
    }

    #[tokio::test]
    async fn output_sorted_by_size_then_first_comment_id() {
        let cfg = test_config();
        let clusterer = GreedyThresholdClusterer { config: &cfg };
        let items = vec![
            item("login keeps failing", "z9"),
            item("login keeps failing", "z8"),
            item("prices are fair", "a1"),
        ];
        let clusters = clusterer.cluster(&items, &tfidf_client()).await.unwrap();
        assert_eq!(clusters[0].member_indices.len(), 2);
        assert_eq!(clusters[0].comment_ids[0], "z8");
        assert_eq!(clusters[1].comment_ids[0], "a1");
    }
}
