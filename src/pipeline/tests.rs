//! End-to-end pipeline tests: full analyze runs against the in-process
//! tfidf embedder, with and without a (failing) LLM client.

use ollama_rs::Ollama;

use crate::config::tests::test_config;
use crate::config::AppConfig;
use crate::embedding::{EmbeddingClient, TfidfEmbedder};
use crate::pipeline::analyze::analyze_request;
use crate::schema::{AnalyzeRequest, AnalyzeResponse, InputSentence};
use crate::sentiment::SentimentAnalyzer;
use crate::{LLMClient, LLMParams};

fn tfidf_client(cfg: &AppConfig) -> EmbeddingClient {
    EmbeddingClient::Tfidf(TfidfEmbedder {
        max_features: cfg.embedding_tfidf_max_features,
        ngram_range: (cfg.embedding_tfidf_ngram_min, cfg.embedding_tfidf_ngram_max),
    })
}

fn sentences(pairs: &[(&str, &str)]) -> Vec<InputSentence> {
    pairs
        .iter()
        .map(|(sentence, id)| InputSentence {
            sentence: sentence.to_string(),
            id: id.to_string(),
        })
        .collect()
}

fn standalone_request(baseline: Vec<InputSentence>) -> AnalyzeRequest {
    AnalyzeRequest {
        survey_title: "Q3 product survey".to_string(),
        theme: "checkout".to_string(),
        baseline,
        comparison: None,
        query: None,
    }
}

/// An LLM client pointing at a port nothing listens on: every call fails
/// fast and the pipeline must fall back.
fn unreachable_llm() -> LLMParams {
    LLMParams {
        llm_client: LLMClient::Ollama(Ollama::new("http://127.0.0.1".to_string(), 9)),
        model: "test-model".to_string(),
        temperature: 0.0,
        timeout_seconds: 2.0,
        max_retries: 0,
    }
}

#[tokio::test]
async fn standalone_analysis_meets_output_contract() {
    let cfg = test_config();
    let req = standalone_request(sentences(&[
        ("checkout keeps failing with my card", "c1"),
        ("checkout keeps failing with my card", "c2"),
        ("the checkout page is confusing", "c3"),
        ("love the new receipt emails", "c4"),
    ]));
    let resp = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        None,
    )
    .await
    .unwrap();

    let AnalyzeResponse::Standalone(out) = resp else {
        panic!("expected standalone response");
    };
    assert!(!out.clusters.is_empty());
    for cluster in &out.clusters {
        assert!(!cluster.title.is_empty());
        assert!(cluster.key_insights.len() >= cfg.cluster_insights_min);
        assert!(cluster.key_insights.len() <= cfg.cluster_insights_max);
    }
}

#[tokio::test]
async fn all_empty_sentences_fail_the_request() {
    let cfg = test_config();
    let req = standalone_request(sentences(&[("   ", "c1"), ("\t", "c2")]));
    let result = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        None,
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn comparison_analysis_emits_dual_cohort_clusters_only() {
    let cfg = test_config();
    let mut req = standalone_request(sentences(&[
        ("refund took three weeks", "b1"),
        ("refund took three weeks", "b2"),
        ("widget colors are ugly", "b3"),
    ]));
    // The refund topic exists in both cohorts; the widget topic only in
    // baseline and must be dropped by the admission rule.
    req.comparison = Some(sentences(&[
        ("refund took three weeks again", "k1"),
        ("refund took three weeks still", "k2"),
    ]));

    let resp = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        None,
    )
    .await
    .unwrap();

    let AnalyzeResponse::Comparison(out) = resp else {
        panic!("expected comparison response");
    };
    assert!(!out.clusters.is_empty());
    for cluster in &out.clusters {
        assert!(!cluster.baseline_sentences.is_empty());
        assert!(!cluster.comparison_sentences.is_empty());
        assert!(cluster.key_similarities.len() >= cfg.comparison_similarities_min);
        assert!(cluster.key_similarities.len() <= cfg.comparison_similarities_max);
        assert!(cluster.key_differences.len() >= cfg.comparison_differences_min);
        assert!(cluster.key_differences.len() <= cfg.comparison_differences_max);
        assert!(!cluster.baseline_sentences.contains(&"b3".to_string()));
    }
}

#[tokio::test]
async fn disjoint_cohorts_fail_the_comparison_request() {
    let cfg = test_config();
    let mut req = standalone_request(sentences(&[
        ("delivery was fine", "b1"),
        ("delivery arrived early", "b2"),
    ]));
    req.comparison = Some(sentences(&[
        ("pricing page has a typo somewhere", "k1"),
        ("pricing table renders wrong", "k2"),
    ]));

    let result = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        None,
    )
    .await;
    // Every cluster is single-cohort, so nothing survives admission
    assert!(result.is_err());
}

#[tokio::test]
async fn overflow_other_keeps_response_within_budget() {
    let mut cfg = test_config();
    cfg.cluster_max_clusters = 3;
    cfg.cluster_similarity_threshold = 0.9;
    let req = standalone_request(sentences(&[
        ("alpha topic here", "c1"),
        ("beta subject there", "c2"),
        ("gamma matter elsewhere", "c3"),
        ("delta story anywhere", "c4"),
        ("epsilon case nowhere", "c5"),
        ("zeta angle somewhere", "c6"),
    ]));

    let resp = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        None,
    )
    .await
    .unwrap();

    let AnalyzeResponse::Standalone(out) = resp else {
        panic!("expected standalone response");
    };
    assert_eq!(out.clusters.len(), 3);
    for cluster in &out.clusters {
        assert!(cluster.key_insights.len() >= cfg.cluster_insights_min);
        assert!(cluster.key_insights.len() <= cfg.cluster_insights_max);
    }
}

#[tokio::test]
async fn failing_llm_never_breaks_the_request() {
    let cfg = test_config();
    let llm = unreachable_llm();
    let req = standalone_request(sentences(&[
        ("app crashes when I open settings", "c1"),
        ("app crashes when I open settings", "c2"),
        ("settings crash every time", "c3"),
    ]));

    let resp = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        Some(&llm),
    )
    .await
    .unwrap();

    let AnalyzeResponse::Standalone(out) = resp else {
        panic!("expected standalone response");
    };
    assert!(!out.clusters.is_empty());
    for cluster in &out.clusters {
        assert!(cluster.key_insights.len() >= cfg.cluster_insights_min);
        assert!(cluster.key_insights.len() <= cfg.cluster_insights_max);
    }
}

#[tokio::test]
async fn failing_llm_comparison_still_conforms() {
    let cfg = test_config();
    let llm = unreachable_llm();
    let mut req = standalone_request(sentences(&[
        ("support reply was slow", "b1"),
        ("support reply was slow", "b2"),
    ]));
    req.comparison = Some(sentences(&[("support reply was slow again", "k1")]));

    let resp = analyze_request(
        &req,
        &cfg,
        &SentimentAnalyzer::new(),
        &tfidf_client(&cfg),
        Some(&llm),
    )
    .await
    .unwrap();

    let AnalyzeResponse::Comparison(out) = resp else {
        panic!("expected comparison response");
    };
    for cluster in &out.clusters {
        assert!(!cluster.baseline_sentences.is_empty());
        assert!(!cluster.comparison_sentences.is_empty());
        assert!(!cluster.key_similarities.is_empty());
        assert!(!cluster.key_differences.is_empty());
    }
}

#[tokio::test]
async fn analysis_is_deterministic_across_runs() {
    let cfg = test_config();
    let req = standalone_request(sentences(&[
        ("shipping delay ruined the gift", "c1"),
        ("shipping delay again this month", "c2"),
        ("great support experience", "c3"),
        ("support team solved it fast", "c4"),
    ]));

    let analyzer = SentimentAnalyzer::new();
    let embedder = tfidf_client(&cfg);
    let first = analyze_request(&req, &cfg, &analyzer, &embedder, None)
        .await
        .unwrap();
    let second = analyze_request(&req, &cfg, &analyzer, &embedder, None)
        .await
        .unwrap();
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}
