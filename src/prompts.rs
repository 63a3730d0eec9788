//! Prompt builders for the cluster labeling and comparison summary calls.

/// System prompt shared by all generation calls.
pub const SYSTEM_PRODUCT_ANALYST: &str = "You are a product insights analyst.\n\
Follow instructions exactly.\n\
Return ONLY valid JSON. Do not wrap in markdown. Do not include explanations.\n";

/// Prompt asking for a cluster title plus key insights.
///
/// Budgets are enforced by the caller's validators, not hardcoded here.
pub fn label_cluster_prompt(theme: &str, sentences: &[String]) -> String {
    format!(
        "Theme: {}\n\
         Task: Create a concise cluster title and key insights.\n\
         Return JSON exactly in this shape: {{\"title\": \"...\", \"key_insights\": [\"...\", \"...\"]}}\n\
         Rules:\n\
         - Title: 3-80 chars, concise, specific\n\
         - Insights: short bullet-like sentences\n\n\
         Sentences:\n- {}",
        theme,
        sentences.join("\n- ")
    )
}

/// Prompt asking for per-cluster baseline-vs-comparison similarities and
/// differences. The provided sentiment label is binding: the model is told
/// its output must stay consistent with it.
pub fn summarize_cluster_comparison_prompt(
    theme: &str,
    cluster_title: &str,
    sentiment: &str,
    baseline_sentences: &[String],
    comparison_sentences: &[String],
) -> String {
    format!(
        "Theme: {}\n\
         Cluster title: {}\n\
         Cluster sentiment: {}\n\
         Task: For THIS cluster only, compare baseline vs comparison feedback.\n\
         Return JSON exactly in this shape: {{\"key_similarities\": [\"...\"], \"key_differences\": [\"...\"]}}\n\
         Rules:\n\
         - IMPORTANT: Your similarities/differences MUST be consistent with the provided sentiment label.\n\
         \x20 Do NOT claim the sentiment is positive if sentiment is negative (and vice versa).\n\
         - Similarities: what both cohorts express in common\n\
         - Differences: what changes between cohorts (volume, details, phrasing)\n\
         - Keep items concise and actionable\n\n\
         Baseline representative sentences:\n- {}\n\n\
         Comparison representative sentences:\n- {}",
        theme,
        cluster_title,
        sentiment,
        baseline_sentences.join("\n- "),
        comparison_sentences.join("\n- ")
    )
}
