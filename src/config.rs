//! Environment-driven configuration, validated once at startup.
//!
//! Every knob the pipeline consumes lives here; the pipeline itself never
//! reads the environment.

use anyhow::{anyhow, Result};
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingProviderKind {
    Tfidf,
    OpenAI,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowStrategy {
    /// Merge overflow clusters into one synthetic "Other" cluster (default).
    Other,
    /// Silently discard overflow clusters.
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    None,
    OpenAiCompatible,
    Ollama,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Embedding
    pub embedding_provider: EmbeddingProviderKind,
    pub embedding_model: String,
    pub embedding_api_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_api_timeout_seconds: f64,
    pub embedding_api_batch_size: usize,
    pub embedding_tfidf_max_features: Option<usize>,
    pub embedding_tfidf_ngram_min: usize,
    pub embedding_tfidf_ngram_max: usize,

    // Clustering
    pub cluster_similarity_threshold: f32,
    pub cluster_max_clusters: usize,
    pub cluster_overflow_strategy: OverflowStrategy,

    // Sentiment
    pub sentiment_strong_negative_threshold: f32,
    pub sentiment_positive_threshold: f32,
    pub sentiment_negative_threshold: f32,

    // Output budgets
    pub cluster_insights_min: usize,
    pub cluster_insights_max: usize,
    pub comparison_similarities_min: usize,
    pub comparison_similarities_max: usize,
    pub comparison_differences_min: usize,
    pub comparison_differences_max: usize,

    // LLM
    pub llm_provider: LlmProvider,
    pub llm_base_url: Option<String>,
    pub llm_api_key: Option<String>,
    pub llm_model: Option<String>,
    pub llm_timeout_seconds: f64,
    pub llm_temperature: f32,
    pub llm_max_retries: u32,
    pub llm_max_clusters: usize,
    pub llm_representative_sentences_per_cluster: usize,
}

pub fn parse_embedding_provider(value: &str) -> Result<EmbeddingProviderKind> {
    match value.trim().to_lowercase().as_str() {
        "tfidf" => Ok(EmbeddingProviderKind::Tfidf),
        "openai" => Ok(EmbeddingProviderKind::OpenAI),
        other => Err(anyhow!(
            "EMBEDDING_PROVIDER must be one of: tfidf, openai (got: {})",
            other
        )),
    }
}

pub fn parse_overflow_strategy(value: &str) -> Result<OverflowStrategy> {
    match value.trim().to_uppercase().as_str() {
        "OTHER" => Ok(OverflowStrategy::Other),
        "DROP" => Ok(OverflowStrategy::Drop),
        other => Err(anyhow!(
            "CLUSTER_OVERFLOW_STRATEGY must be OTHER or DROP (got: {})",
            other
        )),
    }
}

pub fn parse_llm_provider(value: &str) -> Result<LlmProvider> {
    match value.trim().to_lowercase().as_str() {
        "none" => Ok(LlmProvider::None),
        "openai_compatible" => Ok(LlmProvider::OpenAiCompatible),
        "ollama" => Ok(LlmProvider::Ollama),
        other => Err(anyhow!(
            "LLM_PROVIDER must be one of: none, openai_compatible, ollama (got: {})",
            other
        )),
    }
}

fn env_str(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }
        Err(_) => None,
    }
}

fn env_f64(name: &str) -> Result<Option<f64>> {
    match env_str(name) {
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a float, got: {}", name, v)),
        None => Ok(None),
    }
}

fn env_f32(name: &str) -> Result<Option<f32>> {
    Ok(env_f64(name)?.map(|v| v as f32))
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env_str(name) {
        Some(v) => v
            .parse::<usize>()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a non-negative integer, got: {}", name, v)),
        None => Ok(None),
    }
}

fn required_f32(name: &str) -> Result<f32> {
    env_f32(name)?.ok_or_else(|| anyhow!("{} must be set", name))
}

fn required_usize(name: &str) -> Result<usize> {
    env_usize(name)?.ok_or_else(|| anyhow!("{} must be set", name))
}

fn required_budget(min_name: &str, max_name: &str) -> Result<(usize, usize)> {
    let min = required_usize(min_name)?;
    let max = required_usize(max_name)?;
    if min == 0 || min > max {
        return Err(anyhow!(
            "{}/{} must satisfy: min >= 1 and min <= max",
            min_name,
            max_name
        ));
    }
    Ok((min, max))
}

/// Loads and validates the full configuration from the environment.
pub fn load_config() -> Result<AppConfig> {
    let embedding_provider =
        parse_embedding_provider(&env_str("EMBEDDING_PROVIDER").unwrap_or_else(|| "tfidf".into()))?;
    let embedding_model = env_str("EMBEDDING_MODEL")
        .ok_or_else(|| anyhow!("EMBEDDING_MODEL must be set (e.g. via the runtime environment)"))?;
    let embedding_api_base_url =
        env_str("EMBEDDING_API_BASE_URL").unwrap_or_else(|| "https://api.openai.com".into());
    let embedding_api_key = env_str("EMBEDDING_API_KEY");
    if embedding_provider == EmbeddingProviderKind::OpenAI && embedding_api_key.is_none() {
        return Err(anyhow!(
            "EMBEDDING_API_KEY must be set when EMBEDDING_PROVIDER=openai"
        ));
    }

    let embedding_api_timeout_seconds = env_f64("EMBEDDING_API_TIMEOUT_SECONDS")?.unwrap_or(30.0);
    if embedding_api_timeout_seconds <= 0.0 {
        return Err(anyhow!("EMBEDDING_API_TIMEOUT_SECONDS must be > 0"));
    }
    let embedding_api_batch_size = env_usize("EMBEDDING_API_BATCH_SIZE")?.unwrap_or(256);
    if embedding_api_batch_size == 0 {
        return Err(anyhow!("EMBEDDING_API_BATCH_SIZE must be a positive integer"));
    }
    let embedding_tfidf_max_features = env_usize("EMBEDDING_TFIDF_MAX_FEATURES")?;
    if embedding_tfidf_max_features == Some(0) {
        return Err(anyhow!("EMBEDDING_TFIDF_MAX_FEATURES must be > 0 when set"));
    }
    let embedding_tfidf_ngram_min = env_usize("EMBEDDING_TFIDF_NGRAM_MIN")?.unwrap_or(1);
    let embedding_tfidf_ngram_max =
        env_usize("EMBEDDING_TFIDF_NGRAM_MAX")?.unwrap_or(embedding_tfidf_ngram_min);
    if embedding_tfidf_ngram_min == 0 || embedding_tfidf_ngram_max < embedding_tfidf_ngram_min {
        return Err(anyhow!(
            "TF-IDF ngram settings must satisfy: min >= 1 and max >= min"
        ));
    }

    let cluster_similarity_threshold = required_f32("CLUSTER_SIMILARITY_THRESHOLD")?;
    if !(cluster_similarity_threshold > 0.0 && cluster_similarity_threshold <= 1.0) {
        return Err(anyhow!("CLUSTER_SIMILARITY_THRESHOLD must be in (0.0, 1.0]"));
    }
    let cluster_max_clusters = required_usize("CLUSTER_MAX_CLUSTERS")?;
    if cluster_max_clusters == 0 {
        return Err(anyhow!("CLUSTER_MAX_CLUSTERS must be a positive integer"));
    }
    let cluster_overflow_strategy =
        parse_overflow_strategy(&env_str("CLUSTER_OVERFLOW_STRATEGY").unwrap_or_else(|| "OTHER".into()))?;

    let sentiment_strong_negative_threshold = required_f32("SENTIMENT_STRONG_NEGATIVE_THRESHOLD")?;
    let sentiment_positive_threshold = required_f32("SENTIMENT_POSITIVE_THRESHOLD")?;
    let sentiment_negative_threshold = required_f32("SENTIMENT_NEGATIVE_THRESHOLD")?;
    if !(sentiment_negative_threshold < 0.0 && 0.0 < sentiment_positive_threshold) {
        return Err(anyhow!(
            "Sentiment thresholds must satisfy: negative < 0 < positive"
        ));
    }

    let (cluster_insights_min, cluster_insights_max) =
        required_budget("CLUSTER_INSIGHTS_MIN", "CLUSTER_INSIGHTS_MAX")?;
    let (comparison_similarities_min, comparison_similarities_max) =
        required_budget("COMPARISON_SIMILARITIES_MIN", "COMPARISON_SIMILARITIES_MAX")?;
    let (comparison_differences_min, comparison_differences_max) =
        required_budget("COMPARISON_DIFFERENCES_MIN", "COMPARISON_DIFFERENCES_MAX")?;

    let llm_provider = parse_llm_provider(&env_str("LLM_PROVIDER").unwrap_or_else(|| "none".into()))?;
    let llm_base_url = env_str("LLM_BASE_URL");
    let llm_api_key = env_str("LLM_API_KEY");
    let llm_model = env_str("LLM_MODEL");
    match llm_provider {
        LlmProvider::OpenAiCompatible => {
            if llm_base_url.is_none() || llm_api_key.is_none() || llm_model.is_none() {
                return Err(anyhow!(
                    "LLM_BASE_URL / LLM_API_KEY / LLM_MODEL must be set when LLM_PROVIDER=openai_compatible"
                ));
            }
        }
        LlmProvider::Ollama => {
            if llm_base_url.is_none() || llm_model.is_none() {
                return Err(anyhow!(
                    "LLM_BASE_URL / LLM_MODEL must be set when LLM_PROVIDER=ollama"
                ));
            }
        }
        LlmProvider::None => {}
    }

    let llm_timeout_seconds = env_f64("LLM_TIMEOUT_SECONDS")?
        .ok_or_else(|| anyhow!("LLM_TIMEOUT_SECONDS must be set"))?;
    if llm_timeout_seconds <= 0.0 {
        return Err(anyhow!("LLM_TIMEOUT_SECONDS must be > 0"));
    }
    let llm_temperature = required_f32("LLM_TEMPERATURE")?;
    if !(0.0..=2.0).contains(&llm_temperature) {
        return Err(anyhow!("LLM_TEMPERATURE must be between 0.0 and 2.0"));
    }
    let llm_max_retries = env_usize("LLM_MAX_RETRIES")?
        .ok_or_else(|| anyhow!("LLM_MAX_RETRIES must be set"))? as u32;

    let llm_max_clusters = env_usize("LLM_MAX_CLUSTERS")?.unwrap_or(10);
    if llm_max_clusters == 0 {
        return Err(anyhow!("LLM_MAX_CLUSTERS must be a positive integer"));
    }
    let llm_representative_sentences_per_cluster =
        env_usize("LLM_REPRESENTATIVE_SENTENCES_PER_CLUSTER")?.unwrap_or(10);
    if llm_representative_sentences_per_cluster == 0 {
        return Err(anyhow!(
            "LLM_REPRESENTATIVE_SENTENCES_PER_CLUSTER must be a positive integer"
        ));
    }

    Ok(AppConfig {
        embedding_provider,
        embedding_model,
        embedding_api_base_url,
        embedding_api_key,
        embedding_api_timeout_seconds,
        embedding_api_batch_size,
        embedding_tfidf_max_features,
        embedding_tfidf_ngram_min,
        embedding_tfidf_ngram_max,
        cluster_similarity_threshold,
        cluster_max_clusters,
        cluster_overflow_strategy,
        sentiment_strong_negative_threshold,
        sentiment_positive_threshold,
        sentiment_negative_threshold,
        cluster_insights_min,
        cluster_insights_max,
        comparison_similarities_min,
        comparison_similarities_max,
        comparison_differences_min,
        comparison_differences_max,
        llm_provider,
        llm_base_url,
        llm_api_key,
        llm_model,
        llm_timeout_seconds,
        llm_temperature,
        llm_max_retries,
        llm_max_clusters,
        llm_representative_sentences_per_cluster,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shared fixture for pipeline and schema tests.
    pub(crate) fn test_config() -> AppConfig {
        AppConfig {
            embedding_provider: EmbeddingProviderKind::Tfidf,
            embedding_model: "tfidf-local".to_string(),
            embedding_api_base_url: "https://api.openai.com".to_string(),
            embedding_api_key: None,
            embedding_api_timeout_seconds: 30.0,
            embedding_api_batch_size: 256,
            embedding_tfidf_max_features: None,
            embedding_tfidf_ngram_min: 1,
            embedding_tfidf_ngram_max: 1,
            cluster_similarity_threshold: 0.55,
            cluster_max_clusters: 6,
            cluster_overflow_strategy: OverflowStrategy::Other,
            sentiment_strong_negative_threshold: -0.6,
            sentiment_positive_threshold: 0.3,
            sentiment_negative_threshold: -0.2,
            cluster_insights_min: 2,
            cluster_insights_max: 3,
            comparison_similarities_min: 1,
            comparison_similarities_max: 3,
            comparison_differences_min: 1,
            comparison_differences_max: 3,
            llm_provider: LlmProvider::None,
            llm_base_url: None,
            llm_api_key: None,
            llm_model: None,
            llm_timeout_seconds: 10.0,
            llm_temperature: 0.2,
            llm_max_retries: 0,
            llm_max_clusters: 10,
            llm_representative_sentences_per_cluster: 10,
        }
    }

    #[test]
    fn parses_provider_and_strategy_tokens() {
        assert_eq!(
            parse_embedding_provider(" TFIDF ").unwrap(),
            EmbeddingProviderKind::Tfidf
        );
        assert_eq!(
            parse_overflow_strategy("drop").unwrap(),
            OverflowStrategy::Drop
        );
        assert_eq!(
            parse_llm_provider("openai_compatible").unwrap(),
            LlmProvider::OpenAiCompatible
        );
        assert!(parse_embedding_provider("word2vec").is_err());
        assert!(parse_overflow_strategy("KEEP").is_err());
        assert!(parse_llm_provider("anthropic").is_err());
    }
}
