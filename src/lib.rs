pub mod app_api;
pub mod config;
pub mod embedding;
pub mod llm;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod sentiment;
pub mod tfidf;

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use ollama_rs::Ollama;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_PIPELINE: &str = "pipeline";

#[derive(Clone, Debug)]
pub enum LLMClient {
    Ollama(Ollama),
    OpenAI(OpenAIClient<OpenAIConfig>),
}

/// Everything a generation call needs, bundled so call sites stay small.
#[derive(Clone)]
pub struct LLMParams {
    pub llm_client: LLMClient,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: f64,
    pub max_retries: u32,
}
