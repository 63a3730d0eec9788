//! Request/response contract for the analyze endpoint, plus the payload
//! shapes the LLM collaborator must return and their budget validators.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

/// One sentence derived from a comment. `id` is the comment identifier and
/// may repeat across multiple sentences of the same comment.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputSentence {
    pub sentence: String,
    pub id: String,
}

/// Analyze request payload. `baseline` is required; `comparison` switches
/// the response into comparison mode when present and non-empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzeRequest {
    #[serde(rename = "surveyTitle")]
    pub survey_title: String,
    pub theme: String,
    pub baseline: Vec<InputSentence>,
    #[serde(default)]
    pub comparison: Option<Vec<InputSentence>>,
    #[serde(default)]
    pub query: Option<String>,
}

impl AnalyzeRequest {
    /// Comparison cohort with an empty list coerced to absent, so callers
    /// sending `"comparison": []` get standalone behavior.
    pub fn comparison(&self) -> Option<&[InputSentence]> {
        match &self.comparison {
            Some(items) if !items.is_empty() => Some(items),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.survey_title.is_empty() {
            return Err(anyhow!("surveyTitle must be a non-empty string"));
        }
        if self.theme.is_empty() {
            return Err(anyhow!("theme must be a non-empty string"));
        }
        if self.baseline.is_empty() {
            return Err(anyhow!("baseline must contain at least one sentence"));
        }
        for (name, items) in [
            ("baseline", Some(self.baseline.as_slice())),
            ("comparison", self.comparison()),
        ] {
            for item in items.unwrap_or_default() {
                if item.sentence.is_empty() {
                    return Err(anyhow!("{} contains an empty sentence", name));
                }
                if item.id.is_empty() {
                    return Err(anyhow!("{} contains an empty comment id", name));
                }
            }
        }
        Ok(())
    }
}

/// Categorical cluster sentiment, serialized lowercase on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

/// Standalone output cluster: title, sentiment and keyInsights only.
#[derive(Debug, Clone, Serialize)]
pub struct StandaloneCluster {
    pub title: String,
    pub sentiment: SentimentLabel,
    #[serde(rename = "keyInsights")]
    pub key_insights: Vec<String>,
}

/// Comparison output cluster. `baselineSentences` / `comparisonSentences`
/// carry deduplicated comment IDs per cohort; both are non-empty by the
/// admission rule.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonCluster {
    pub title: String,
    pub sentiment: SentimentLabel,
    #[serde(rename = "baselineSentences")]
    pub baseline_sentences: Vec<String>,
    #[serde(rename = "comparisonSentences")]
    pub comparison_sentences: Vec<String>,
    #[serde(rename = "keySimilarities")]
    pub key_similarities: Vec<String>,
    #[serde(rename = "keyDifferences")]
    pub key_differences: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponseStandalone {
    pub clusters: Vec<StandaloneCluster>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeResponseComparison {
    pub clusters: Vec<ComparisonCluster>,
}

/// The two mutually exclusive response shapes, flattened on the wire.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum AnalyzeResponse {
    Standalone(AnalyzeResponseStandalone),
    Comparison(AnalyzeResponseComparison),
}

/// Title + insights returned by the LLM labeling call.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterLabeling {
    pub title: String,
    pub key_insights: Vec<String>,
}

impl ClusterLabeling {
    /// Drops blank insight lines; the title must be 3-80 characters.
    pub fn cleaned(mut self) -> Result<Self> {
        let title_len = self.title.trim().chars().count();
        if !(3..=80).contains(&title_len) {
            return Err(anyhow!(
                "cluster title length {} outside 3-80 characters",
                title_len
            ));
        }
        self.key_insights = strip_blank_items(self.key_insights);
        Ok(self)
    }
}

/// Similarities + differences returned by the LLM comparison call.
#[derive(Debug, Clone, Deserialize)]
pub struct ComparisonSummary {
    pub key_similarities: Vec<String>,
    pub key_differences: Vec<String>,
}

impl ComparisonSummary {
    pub fn cleaned(mut self) -> Self {
        self.key_similarities = strip_blank_items(self.key_similarities);
        self.key_differences = strip_blank_items(self.key_differences);
        self
    }
}

fn strip_blank_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Rejects LLM labelings whose insight count falls outside the configured
/// budget; the caller falls back to deterministic output.
pub fn validate_cluster_labeling_budget(label: &ClusterLabeling, cfg: &AppConfig) -> Result<()> {
    let n = label.key_insights.len();
    if n < cfg.cluster_insights_min || n > cfg.cluster_insights_max {
        return Err(anyhow!(
            "key_insights count {} out of range [{}, {}]",
            n,
            cfg.cluster_insights_min,
            cfg.cluster_insights_max
        ));
    }
    Ok(())
}

/// Rejects LLM comparison summaries violating either list budget.
pub fn validate_comparison_budget(summary: &ComparisonSummary, cfg: &AppConfig) -> Result<()> {
    let ns = summary.key_similarities.len();
    if ns < cfg.comparison_similarities_min || ns > cfg.comparison_similarities_max {
        return Err(anyhow!(
            "key_similarities count {} out of range [{}, {}]",
            ns,
            cfg.comparison_similarities_min,
            cfg.comparison_similarities_max
        ));
    }
    let nd = summary.key_differences.len();
    if nd < cfg.comparison_differences_min || nd > cfg.comparison_differences_max {
        return Err(anyhow!(
            "key_differences count {} out of range [{}, {}]",
            nd,
            cfg.comparison_differences_min,
            cfg.comparison_differences_max
        ));
    }
    Ok(())
}
