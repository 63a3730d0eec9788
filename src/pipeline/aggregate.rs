//! Sentence-level clusters → comment-id-level reports.

use tracing::info;

use crate::config::AppConfig;
use crate::pipeline::clustering::ClusterInternal;
use crate::pipeline::{stable_dedupe_sorted, ClusterReport, SemanticSentence, Source};
use crate::sentiment::cluster_sentiment;
use crate::TARGET_PIPELINE;

#[derive(Debug, Clone, Copy)]
pub struct Aggregator<'a> {
    pub config: &'a AppConfig,
}

impl Aggregator<'_> {
    /// Builds one report per cluster, in cluster order.
    ///
    /// Per cluster: comment ids are split by cohort, deduplicated and
    /// sorted; member compound scores are reduced to a sentiment label; and
    /// representative texts are taken per cohort by walking
    /// `member_indices` in order until the configured cap, so the sample is
    /// deterministic and bounded regardless of cluster size.
    pub fn build_reports(
        &self,
        theme: &str,
        sentences: &[SemanticSentence],
        clusters: &[ClusterInternal],
        titles: &[String],
    ) -> Vec<ClusterReport> {
        info!(
            target: TARGET_PIPELINE,
            "Building {} cluster reports for theme '{}' over {} sentences",
            clusters.len(),
            theme,
            sentences.len()
        );

        let cap = self.config.llm_representative_sentences_per_cluster;
        let mut reports = Vec::with_capacity(clusters.len());

        for (idx, cluster) in clusters.iter().enumerate() {
            let members: Vec<&SemanticSentence> = cluster
                .member_indices
                .iter()
                .map(|&i| &sentences[i])
                .collect();

            let baseline_ids: Vec<String> = members
                .iter()
                .filter(|m| m.source == Source::Baseline)
                .map(|m| m.comment_id.clone())
                .collect();
            let comparison_ids: Vec<String> = members
                .iter()
                .filter(|m| m.source == Source::Comparison)
                .map(|m| m.comment_id.clone())
                .collect();

            let compounds: Vec<f32> = members.iter().map(|m| m.compound).collect();
            let sentiment = cluster_sentiment(&compounds, self.config);

            let mut baseline_rep: Vec<String> = Vec::new();
            let mut comparison_rep: Vec<String> = Vec::new();
            for member in &members {
                match member.source {
                    Source::Baseline if baseline_rep.len() < cap => {
                        baseline_rep.push(member.text.clone());
                    }
                    Source::Comparison if comparison_rep.len() < cap => {
                        comparison_rep.push(member.text.clone());
                    }
                    _ => {}
                }
            }

            reports.push(ClusterReport {
                title: titles[idx].clone(),
                sentiment,
                baseline_comment_ids: stable_dedupe_sorted(&baseline_ids),
                comparison_comment_ids: stable_dedupe_sorted(&comparison_ids),
                baseline_representative_texts: baseline_rep,
                comparison_representative_texts: comparison_rep,
            });
        }

        reports
    }
}
