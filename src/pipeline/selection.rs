//! Cluster-count budget enforcement.
//!
//! Clusters are ranked by importance; overflow is either dropped or merged
//! into a single synthetic "Other" cluster that is flagged as such for
//! downstream LLM-eligibility checks.

use tracing::info;

use crate::config::{AppConfig, OverflowStrategy};
use crate::pipeline::clustering::ClusterInternal;
use crate::TARGET_PIPELINE;

/// Applies the max-cluster budget.
///
/// Importance order: unique comment-id count desc, member count desc, first
/// comment id asc. At or under the budget the sorted list is returned
/// unchanged. On overflow, DROP keeps the top `max`; OTHER keeps the top
/// `max - 1` and appends one merged tail cluster with `is_other` set.
pub fn select_top_clusters(
    clusters: Vec<ClusterInternal>,
    config: &AppConfig,
) -> Vec<ClusterInternal> {
    if clusters.is_empty() {
        return clusters;
    }

    let mut sorted = clusters;
    sorted.sort_by(|a, b| {
        b.comment_ids
            .len()
            .cmp(&a.comment_ids.len())
            .then_with(|| b.member_indices.len().cmp(&a.member_indices.len()))
            .then_with(|| a.comment_ids[0].cmp(&b.comment_ids[0]))
    });

    let max = config.cluster_max_clusters;
    if sorted.len() <= max {
        return sorted;
    }

    info!(
        target: TARGET_PIPELINE,
        "Cluster overflow: {} clusters over budget {} ({:?})",
        sorted.len(),
        max,
        config.cluster_overflow_strategy
    );

    if config.cluster_overflow_strategy == OverflowStrategy::Drop {
        sorted.truncate(max);
        return sorted;
    }

    // OTHER: merge everything past the head into one synthetic cluster.
    let tail = sorted.split_off(max.saturating_sub(1));
    let mut member_indices: Vec<usize> = tail
        .iter()
        .flat_map(|c| c.member_indices.iter().copied())
        .collect();
    member_indices.sort();
    member_indices.dedup();
    let mut comment_ids: Vec<String> = tail
        .iter()
        .flat_map(|c| c.comment_ids.iter().cloned())
        .collect();
    comment_ids.sort();
    comment_ids.dedup();

    sorted.push(ClusterInternal {
        member_indices,
        comment_ids,
        is_other: true,
    });
    sorted
}
