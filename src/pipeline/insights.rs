//! Deterministic fallback titles, insights, similarities and differences.
//!
//! Keyword extraction runs TF-IDF over the representative texts only, with
//! English stop words and (1,2)-grams, ranking terms by mean score with an
//! alphabetical tie-break. Every list is padded or truncated to its
//! configured budget so the output contract holds even when the texts give
//! us nothing to say.

use crate::config::AppConfig;
use crate::schema::SentimentLabel;
use crate::tfidf::{TfidfVectorizer, ENGLISH_STOP_WORDS};

const NO_ADDITIONAL_INSIGHT: &str = "(no additional insight)";

/// Top keywords by mean TF-IDF score across `texts`.
fn top_terms_tfidf(texts: &[String], top_k: usize) -> Vec<String> {
    if texts.is_empty() {
        return Vec::new();
    }

    let vectorizer = TfidfVectorizer {
        ngram_range: (1, 2),
        max_features: Some(5000),
        stop_words: Some(ENGLISH_STOP_WORDS),
    };
    let matrix = vectorizer.fit_transform(texts);
    if matrix.terms.is_empty() {
        return Vec::new();
    }

    let means = matrix.mean_scores();
    let mut ranked: Vec<(String, f32)> = matrix.terms.into_iter().zip(means).collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(top_k);
    ranked.into_iter().map(|(term, _)| term).collect()
}

/// Pads with a placeholder or truncates so exactly `n` items come back.
fn cap_list(mut items: Vec<String>, n: usize) -> Vec<String> {
    if items.len() >= n {
        items.truncate(n);
        return items;
    }
    while items.len() < n {
        items.push(NO_ADDITIONAL_INSIGHT.to_string());
    }
    items
}

#[derive(Debug, Clone, Copy)]
pub struct DeterministicInsightGenerator<'a> {
    pub config: &'a AppConfig,
}

impl DeterministicInsightGenerator<'_> {
    /// Keyword title plus templated insights for a standalone cluster.
    pub fn standalone_title_and_insights(
        &self,
        theme: &str,
        sentiment: SentimentLabel,
        texts: &[String],
    ) -> (String, Vec<String>) {
        let terms = top_terms_tfidf(texts, 4);
        let title = if terms.is_empty() {
            format!("{} insights", theme)
        } else {
            terms[..terms.len().min(2)].join(" / ")
        };

        let n = (self.config.cluster_insights_min.max(2)).min(self.config.cluster_insights_max);
        let insights = vec![
            format!(
                "Key theme: **{}**; cluster sentiment appears **{}**.",
                theme,
                sentiment.as_str()
            ),
            if terms.is_empty() {
                "Users share feedback on this theme.".to_string()
            } else {
                format!("Top terms: **{}**.", terms[..terms.len().min(3)].join(", "))
            },
            "Details vary across comments; consider investigating representative examples."
                .to_string(),
        ];
        let insights = cap_list(
            insights.into_iter().filter(|s| !s.trim().is_empty()).collect(),
            n,
        );
        (title, insights)
    }

    /// Keyword title over both cohorts' representative texts.
    pub fn comparison_title(
        &self,
        theme: &str,
        baseline_texts: &[String],
        comparison_texts: &[String],
    ) -> String {
        let mut texts = baseline_texts.to_vec();
        texts.extend_from_slice(comparison_texts);
        let terms = top_terms_tfidf(&texts, 4);
        if terms.is_empty() {
            format!("{} comparison", theme)
        } else {
            terms[..terms.len().min(2)].join(" / ")
        }
    }

    /// Keyword-driven similarities and differences between the cohorts.
    ///
    /// Shared terms drive the similarity lines; cohort-exclusive terms
    /// drive one difference line per cohort.
    pub fn comparison_similarities_differences(
        &self,
        theme: &str,
        cluster_title: &str,
        baseline_texts: &[String],
        comparison_texts: &[String],
    ) -> (Vec<String>, Vec<String>) {
        let base_terms = top_terms_tfidf(baseline_texts, 6);
        let comp_terms = top_terms_tfidf(comparison_texts, 6);

        let mut shared: Vec<&String> =
            base_terms.iter().filter(|t| comp_terms.contains(t)).collect();
        shared.sort();
        let mut base_only: Vec<&String> =
            base_terms.iter().filter(|t| !comp_terms.contains(t)).collect();
        base_only.sort();
        let mut comp_only: Vec<&String> =
            comp_terms.iter().filter(|t| !base_terms.contains(t)).collect();
        comp_only.sort();

        let ns = (self.config.comparison_similarities_min.max(1))
            .min(self.config.comparison_similarities_max);
        let nd = (self.config.comparison_differences_min.max(1))
            .min(self.config.comparison_differences_max);

        let sims = vec![
            format!(
                "Both cohorts discuss **{}** within theme **{}**.",
                cluster_title, theme
            ),
            if shared.is_empty() {
                "Language overlaps but with different emphasis.".to_string()
            } else {
                format!("Shared terms: **{}**.", join_terms(&shared, 3))
            },
        ];
        let diffs = vec![
            if base_only.is_empty() {
                "Baseline has fewer unique terms.".to_string()
            } else {
                format!("Baseline unique terms: **{}**.", join_terms(&base_only, 3))
            },
            if comp_only.is_empty() {
                "Comparison has fewer unique terms.".to_string()
            } else {
                format!("Comparison unique terms: **{}**.", join_terms(&comp_only, 3))
            },
        ];

        (cap_list(sims, ns), cap_list(diffs, nd))
    }
}

fn join_terms(terms: &[&String], cap: usize) -> String {
    terms
        .iter()
        .take(cap)
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn standalone_title_from_top_terms() {
        let cfg = test_config();
        let gen = DeterministicInsightGenerator { config: &cfg };
        let (title, insights) = gen.standalone_title_and_insights(
            "delivery",
            SentimentLabel::Negative,
            &texts(&[
                "shipping took forever",
                "shipping delay again",
                "shipping delay ruined my week",
            ]),
        );
        assert!(title.contains("shipping") || title.contains("delay"));
        assert!(title.contains(" / "));
        assert!(insights.len() >= cfg.cluster_insights_min);
        assert!(insights.len() <= cfg.cluster_insights_max);
        assert!(insights[0].contains("negative"));
    }

    #[test]
    fn standalone_title_falls_back_on_stopword_input() {
        let cfg = test_config();
        let gen = DeterministicInsightGenerator { config: &cfg };
        let (title, insights) = gen.standalone_title_and_insights(
            "delivery",
            SentimentLabel::Neutral,
            &texts(&["it was what it was"]),
        );
        assert_eq!(title, "delivery insights");
        assert!(insights.contains(&"Users share feedback on this theme.".to_string()));
    }

    #[test]
    fn insights_budget_always_honored() {
        let mut cfg = test_config();
        cfg.cluster_insights_min = 3;
        cfg.cluster_insights_max = 3;
        let gen = DeterministicInsightGenerator { config: &cfg };
        let (_, insights) =
            gen.standalone_title_and_insights("t", SentimentLabel::Neutral, &[]);
        assert_eq!(insights.len(), 3);
    }

    #[test]
    fn comparison_title_defaults_when_no_terms() {
        let cfg = test_config();
        let gen = DeterministicInsightGenerator { config: &cfg };
        assert_eq!(gen.comparison_title("pricing", &[], &[]), "pricing comparison");
    }

    #[test]
    fn shared_terms_surface_in_similarities() {
        let cfg = test_config();
        let gen = DeterministicInsightGenerator { config: &cfg };
        let (sims, diffs) = gen.comparison_similarities_differences(
            "pricing",
            "subscription cost",
            &texts(&["subscription price is high", "subscription price hurts"]),
            &texts(&["subscription price is fine now", "subscription price improved"]),
        );
        assert!(sims.len() >= cfg.comparison_similarities_min);
        assert!(sims.len() <= cfg.comparison_similarities_max);
        assert!(diffs.len() >= cfg.comparison_differences_min);
        assert!(diffs.len() <= cfg.comparison_differences_max);
        assert!(sims[0].contains("subscription cost"));
        assert!(sims.iter().any(|s| s.contains("Shared terms")));
    }

    #[test]
    fn padding_uses_placeholder_line() {
        let mut cfg = test_config();
        cfg.comparison_similarities_min = 3;
        cfg.comparison_similarities_max = 3;
        let gen = DeterministicInsightGenerator { config: &cfg };
        let (sims, _) =
            gen.comparison_similarities_differences("t", "title", &[], &[]);
        assert_eq!(sims.len(), 3);
        assert_eq!(sims[2], NO_ADDITIONAL_INSIGHT);
    }

    #[test]
    fn top_terms_are_ranked_and_deterministic() {
        let a = top_terms_tfidf(
            &texts(&["refund delay", "refund delay", "refund support"]),
            2,
        );
        let b = top_terms_tfidf(
            &texts(&["refund delay", "refund delay", "refund support"]),
            2,
        );
        assert_eq!(a, b);
        assert!(a.contains(&"refund".to_string()));
    }
}
