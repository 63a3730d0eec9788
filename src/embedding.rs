//! Embedding providers behind one enum, mirroring how the LLM clients are
//! modeled. The tfidf provider fits on the request's own texts and needs no
//! network; the openai provider calls an OpenAI-compatible embeddings API.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{AppConfig, EmbeddingProviderKind};
use crate::tfidf::TfidfVectorizer;
use crate::TARGET_PIPELINE;

#[derive(Clone, Debug)]
pub enum EmbeddingClient {
    Tfidf(TfidfEmbedder),
    OpenAI(RemoteEmbedder),
}

impl EmbeddingClient {
    /// Builds the provider selected by `EMBEDDING_PROVIDER`.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        match config.embedding_provider {
            EmbeddingProviderKind::Tfidf => Ok(EmbeddingClient::Tfidf(TfidfEmbedder {
                max_features: config.embedding_tfidf_max_features,
                ngram_range: (
                    config.embedding_tfidf_ngram_min,
                    config.embedding_tfidf_ngram_max,
                ),
            })),
            EmbeddingProviderKind::OpenAI => {
                let api_key = config
                    .embedding_api_key
                    .clone()
                    .ok_or_else(|| anyhow!("embedding API key missing for openai provider"))?;
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs_f64(config.embedding_api_timeout_seconds))
                    .build()?;
                Ok(EmbeddingClient::OpenAI(RemoteEmbedder {
                    client,
                    base_url: config.embedding_api_base_url.trim_end_matches('/').to_string(),
                    api_key,
                    model: config.embedding_model.clone(),
                    batch_size: config.embedding_api_batch_size,
                }))
            }
        }
    }

    /// Maps texts to unit-normalized vectors, order-preserving and the same
    /// length as the input.
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self {
            EmbeddingClient::Tfidf(embedder) => Ok(embedder.embed(texts)),
            EmbeddingClient::OpenAI(embedder) => embedder.embed(texts).await,
        }
    }
}

/// Request-local TF-IDF embeddings: the vectorizer is fit on the texts being
/// embedded, so the vocabulary is per-request and rows come back already
/// l2-normalized.
#[derive(Clone, Debug)]
pub struct TfidfEmbedder {
    pub max_features: Option<usize>,
    pub ngram_range: (usize, usize),
}

impl TfidfEmbedder {
    pub fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }

        info!(target: TARGET_PIPELINE, "Embedding {} texts with tfidf provider", texts.len());
        let vectorizer = TfidfVectorizer {
            ngram_range: self.ngram_range,
            max_features: self.max_features,
            stop_words: None,
        };
        let matrix = vectorizer.fit_transform(texts);
        if matrix.terms.is_empty() {
            // Empty vocabulary after tokenization; similarity will be zero
            // everywhere and each sentence ends up a singleton.
            warn!(
                target: TARGET_PIPELINE,
                "tfidf vocabulary is empty for {} texts", texts.len()
            );
        }
        matrix.rows
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/v1/embeddings` client with batched requests.
#[derive(Clone, Debug)]
pub struct RemoteEmbedder {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    batch_size: usize,
}

impl RemoteEmbedder {
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        info!(
            target: TARGET_PIPELINE,
            "Embedding {} texts with openai provider ({})", texts.len(), self.model
        );
        let endpoint = format!("{}/v1/embeddings", self.base_url);
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size.max(1)) {
            let response = self
                .client
                .post(&endpoint)
                .bearer_auth(&self.api_key)
                .json(&serde_json::json!({ "model": self.model, "input": batch }))
                .send()
                .await?
                .error_for_status()?;
            let payload: EmbeddingsResponse = response.json().await?;
            if payload.data.len() != batch.len() {
                return Err(anyhow!(
                    "embedding API returned {} vectors for a batch of {}",
                    payload.data.len(),
                    batch.len()
                ));
            }
            vectors.extend(payload.data.into_iter().map(|row| row.embedding));
        }

        for row in vectors.iter_mut() {
            normalize_row(row);
        }
        Ok(vectors)
    }
}

fn normalize_row(row: &mut [f32]) {
    let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in row.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn embedder() -> TfidfEmbedder {
        TfidfEmbedder {
            max_features: None,
            ngram_range: (1, 1),
        }
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(embedder().embed(&[]).is_empty());
    }

    #[test]
    fn one_row_per_text_with_unit_norm() {
        let rows = embedder().embed(&texts(&["refund is late", "refund was denied", "great app"]));
        assert_eq!(rows.len(), 3);
        for row in &rows {
            let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn identical_texts_embed_identically() {
        let rows = embedder().embed(&texts(&["billing portal", "billing portal", "shipping"]));
        assert_eq!(rows[0], rows[1]);
        assert_ne!(rows[0], rows[2]);
    }

    #[test]
    fn tokenless_corpus_gives_zero_width_rows() {
        let rows = embedder().embed(&texts(&["!!", "??"]));
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_empty()));
    }

    #[test]
    fn normalize_row_leaves_zero_vectors_alone() {
        let mut row = vec![0.0f32, 0.0];
        normalize_row(&mut row);
        assert_eq!(row, vec![0.0, 0.0]);
    }
}
