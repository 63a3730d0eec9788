//! Request orchestration: normalization, scoring, clustering, selection,
//! aggregation, and LLM-first/fallback output generation.

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::config::{AppConfig, OverflowStrategy};
use crate::embedding::EmbeddingClient;
use crate::llm;
use crate::normalize::normalize_text;
use crate::pipeline::aggregate::Aggregator;
use crate::pipeline::clustering::GreedyThresholdClusterer;
use crate::pipeline::insights::DeterministicInsightGenerator;
use crate::pipeline::selection::select_top_clusters;
use crate::pipeline::{make_sentence_ids, SemanticSentence, SentenceItem, Source};
use crate::schema::{
    validate_cluster_labeling_budget, validate_comparison_budget, AnalyzeRequest, AnalyzeResponse,
    AnalyzeResponseComparison, AnalyzeResponseStandalone, ComparisonCluster, InputSentence,
    StandaloneCluster,
};
use crate::sentiment::SentimentAnalyzer;
use crate::{LLMParams, TARGET_LLM_REQUEST, TARGET_PIPELINE};

/// Hard cap on the number of sentences fed into a labeling prompt.
const LABEL_PROMPT_SENTENCE_CAP: usize = 50;

pub struct RequestAnalyzer<'a> {
    pub config: &'a AppConfig,
    pub sentiment: &'a SentimentAnalyzer,
    pub embedder: &'a EmbeddingClient,
    pub llm: Option<&'a LLMParams>,
}

impl RequestAnalyzer<'_> {
    /// Runs the full pipeline for one request.
    ///
    /// Clustering, sentiment, and the fallback generators are fully
    /// deterministic; LLM enhancement is attempted per cluster and any
    /// failure there keeps the deterministic result (fail-soft, no retry
    /// at this level).
    pub async fn analyze(&self, req: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let comparison_requested = req.comparison().is_some();

        // Normalize both cohorts, baseline block first, dropping sentences
        // that come out empty.
        let mut items: Vec<SentenceItem> = Vec::new();
        collect_items(&mut items, &req.baseline, Source::Baseline);
        if let Some(comparison) = req.comparison() {
            collect_items(&mut items, comparison, Source::Comparison);
        }
        if items.is_empty() {
            return Err(anyhow!("no valid sentences after normalization"));
        }

        let sentence_ids = make_sentence_ids(items.len());
        let sentences: Vec<SemanticSentence> = items
            .iter()
            .enumerate()
            .map(|(i, it)| SemanticSentence {
                sentence_id: sentence_ids[i].clone(),
                comment_id: it.comment_id.clone(),
                text: it.text.clone(),
                source: it.source,
                compound: self.sentiment.compound(&it.text),
            })
            .collect();
        debug!(
            target: TARGET_PIPELINE,
            "Scored {} sentences ({}..{})",
            sentences.len(),
            sentences.first().map(|s| s.sentence_id.as_str()).unwrap_or(""),
            sentences.last().map(|s| s.sentence_id.as_str()).unwrap_or("")
        );

        let clusterer = GreedyThresholdClusterer { config: self.config };
        let clusters_raw = clusterer.cluster(&items, self.embedder).await?;
        let overflowed = self.config.cluster_overflow_strategy == OverflowStrategy::Other
            && clusters_raw.len() > self.config.cluster_max_clusters;
        let clusters = select_top_clusters(clusters_raw, self.config);

        // Report-level fallback titles; both output modes replace them with
        // keyword or LLM titles below.
        let titles: Vec<String> = clusters
            .iter()
            .enumerate()
            .map(|(idx, c)| {
                if c.is_other {
                    "Other".to_string()
                } else {
                    format!("{} cluster {}", req.theme, idx + 1)
                }
            })
            .collect();

        let aggregator = Aggregator { config: self.config };
        let reports = aggregator.build_reports(&req.theme, &sentences, &clusters, &titles);

        let fallback = DeterministicInsightGenerator { config: self.config };
        let rep_cap = self.config.llm_representative_sentences_per_cluster;

        let mut standalone_out: Vec<StandaloneCluster> = Vec::new();
        let mut comparison_out: Vec<ComparisonCluster> = Vec::new();

        for (idx, (cluster, report)) in clusters.iter().zip(reports.iter()).enumerate() {
            let llm_for_labeling = self
                .llm
                .filter(|_| idx < self.config.llm_max_clusters && !cluster.is_other);
            // The summary call is position-gated only; the merged Other
            // cluster still gets a cohort comparison.
            let llm_for_summary = self.llm.filter(|_| idx < self.config.llm_max_clusters);

            if comparison_requested {
                let baseline_ids = report.baseline_comment_ids.clone();
                let comparison_ids = report.comparison_comment_ids.clone();
                // Admission rule: a comparison cluster needs both cohorts.
                if baseline_ids.is_empty() || comparison_ids.is_empty() {
                    info!(
                        target: TARGET_PIPELINE,
                        "Dropping cluster {} from comparison output (single-cohort)", idx
                    );
                    continue;
                }

                let mut title = fallback.comparison_title(
                    &req.theme,
                    &report.baseline_representative_texts,
                    &report.comparison_representative_texts,
                );
                if let Some(params) = llm_for_labeling {
                    let mut label_texts = report.baseline_representative_texts.clone();
                    label_texts.extend_from_slice(&report.comparison_representative_texts);
                    label_texts.truncate(rep_cap);
                    match llm::label_cluster(params, &req.theme, &label_texts).await.and_then(
                        |labeling| {
                            validate_cluster_labeling_budget(&labeling, self.config)?;
                            Ok(labeling)
                        },
                    ) {
                        Ok(labeling) => title = labeling.title,
                        Err(e) => {
                            warn!(
                                target: TARGET_LLM_REQUEST,
                                "Comparison title generation fell back for cluster {}: {:#}", idx, e
                            );
                        }
                    }
                }

                let (mut key_similarities, mut key_differences) = fallback
                    .comparison_similarities_differences(
                        &req.theme,
                        &title,
                        &report.baseline_representative_texts,
                        &report.comparison_representative_texts,
                    );

                if let Some(params) = llm_for_summary {
                    let baseline_rep: Vec<String> = report
                        .baseline_representative_texts
                        .iter()
                        .take(rep_cap)
                        .cloned()
                        .collect();
                    let comparison_rep: Vec<String> = report
                        .comparison_representative_texts
                        .iter()
                        .take(rep_cap)
                        .cloned()
                        .collect();
                    match llm::summarize_cluster_comparison(
                        params,
                        &req.theme,
                        &title,
                        report.sentiment.as_str(),
                        &baseline_rep,
                        &comparison_rep,
                    )
                    .await
                    .and_then(|summary| {
                        validate_comparison_budget(&summary, self.config)?;
                        Ok(summary)
                    }) {
                        Ok(summary) => {
                            key_similarities = summary.key_similarities;
                            key_differences = summary.key_differences;
                        }
                        Err(e) => {
                            warn!(
                                target: TARGET_LLM_REQUEST,
                                "Comparison summary fell back for cluster {}: {:#}", idx, e
                            );
                        }
                    }
                }

                comparison_out.push(ComparisonCluster {
                    title,
                    sentiment: report.sentiment,
                    baseline_sentences: baseline_ids,
                    comparison_sentences: comparison_ids,
                    key_similarities,
                    key_differences,
                });
            } else {
                let texts = if report.baseline_representative_texts.is_empty() {
                    &report.comparison_representative_texts
                } else {
                    &report.baseline_representative_texts
                };

                let (mut title, mut insights) = fallback.standalone_title_and_insights(
                    &req.theme,
                    report.sentiment,
                    texts,
                );
                if let Some(params) = llm_for_labeling {
                    let label_texts: Vec<String> = texts
                        .iter()
                        .take(LABEL_PROMPT_SENTENCE_CAP)
                        .cloned()
                        .collect();
                    match llm::label_cluster(params, &req.theme, &label_texts).await.and_then(
                        |labeling| {
                            validate_cluster_labeling_budget(&labeling, self.config)?;
                            Ok(labeling)
                        },
                    ) {
                        Ok(labeling) => {
                            title = labeling.title;
                            insights = labeling.key_insights;
                        }
                        Err(e) => {
                            warn!(
                                target: TARGET_LLM_REQUEST,
                                "Cluster labeling fell back for cluster {}: {:#}", idx, e
                            );
                        }
                    }
                }

                standalone_out.push(StandaloneCluster {
                    title,
                    sentiment: report.sentiment,
                    key_insights: insights,
                });
            }
        }

        if comparison_requested {
            if comparison_out.is_empty() {
                return Err(anyhow!(
                    "no comparable clusters found (baseline and comparison did not overlap after processing)"
                ));
            }
            info!(
                target: TARGET_PIPELINE,
                "Comparison analysis complete: {} clusters (overflowed: {})",
                comparison_out.len(),
                overflowed
            );
            return Ok(AnalyzeResponse::Comparison(AnalyzeResponseComparison {
                clusters: comparison_out,
            }));
        }

        info!(
            target: TARGET_PIPELINE,
            "Standalone analysis complete: {} clusters (overflowed: {})",
            standalone_out.len(),
            overflowed
        );
        Ok(AnalyzeResponse::Standalone(AnalyzeResponseStandalone {
            clusters: standalone_out,
        }))
    }
}

fn collect_items(items: &mut Vec<SentenceItem>, inputs: &[InputSentence], source: Source) {
    for input in inputs {
        let text = normalize_text(&input.sentence);
        if text.is_empty() {
            continue;
        }
        items.push(SentenceItem {
            text,
            comment_id: input.id.clone(),
            source,
        });
    }
}

/// Convenience entrypoint used by the web handler.
pub async fn analyze_request(
    req: &AnalyzeRequest,
    config: &AppConfig,
    sentiment: &SentimentAnalyzer,
    embedder: &EmbeddingClient,
    llm: Option<&LLMParams>,
) -> Result<AnalyzeResponse> {
    RequestAnalyzer {
        config,
        sentiment,
        embedder,
        llm,
    }
    .analyze(req)
    .await
}
