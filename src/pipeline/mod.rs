//! The deterministic analysis pipeline: shared sentence/cluster types plus
//! the clustering, selection, aggregation, insight, and orchestration
//! stages.

pub mod aggregate;
pub mod analyze;
pub mod clustering;
pub mod insights;
pub mod selection;

#[cfg(test)]
mod tests;

use crate::schema::SentimentLabel;

/// Which cohort a sentence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Baseline,
    Comparison,
}

/// One normalized input sentence. `comment_id` is the caller-provided id
/// and may repeat across sentences of the same comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceItem {
    pub text: String,
    pub comment_id: String,
    pub source: Source,
}

/// Sentence-level derived features. `sentence_id` is deterministic within a
/// single request ("s0", "s1", ...) and exists for tracing.
#[derive(Debug, Clone)]
pub struct SemanticSentence {
    pub sentence_id: String,
    pub comment_id: String,
    pub text: String,
    pub source: Source,
    pub compound: f32,
}

/// Reporting view of one cluster, used to format outputs and to drive the
/// per-cluster comparison LLM calls. Built once, never mutated.
#[derive(Debug, Clone)]
pub struct ClusterReport {
    pub title: String,
    pub sentiment: SentimentLabel,
    pub baseline_comment_ids: Vec<String>,
    pub comparison_comment_ids: Vec<String>,
    pub baseline_representative_texts: Vec<String>,
    pub comparison_representative_texts: Vec<String>,
}

/// Deterministic per-request sentence ids.
pub fn make_sentence_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("s{}", i)).collect()
}

/// Sorted, deduplicated copy of `values`.
pub fn stable_dedupe_sorted(values: &[String]) -> Vec<String> {
    let mut out: Vec<String> = values.to_vec();
    out.sort();
    out.dedup();
    out
}
