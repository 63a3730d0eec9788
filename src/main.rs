use anyhow::Result;
use tracing::info;

use facet::app_api::{self, AppState};
use facet::config::load_config;
use facet::embedding::EmbeddingClient;
use facet::llm::create_llm_params;
use facet::logging::configure_logging;
use facet::sentiment::SentimentAnalyzer;

#[tokio::main]
async fn main() -> Result<()> {
    configure_logging();

    let config = load_config()?;
    info!(
        "Loaded configuration: embedding={:?}, llm={:?}, max_clusters={}",
        config.embedding_provider, config.llm_provider, config.cluster_max_clusters
    );

    let sentiment = SentimentAnalyzer::new();
    let embedder = EmbeddingClient::from_config(&config)?;
    let llm = create_llm_params(&config)?;

    app_api::serve(AppState {
        config,
        sentiment,
        embedder,
        llm,
    })
    .await
}
