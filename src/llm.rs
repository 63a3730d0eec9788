//! LLM transport and the two typed calls the pipeline makes.
//!
//! Retries and timeouts live here, in the transport layer; the pipeline
//! itself never retries. Callers treat any `Err` as "use the deterministic
//! fallback".

use anyhow::{anyhow, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client as OpenAIClient;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, warn};
use url::Url;

use crate::config::{AppConfig, LlmProvider};
use crate::prompts;
use crate::schema::{ClusterLabeling, ComparisonSummary};
use crate::{LLMClient, LLMParams, TARGET_LLM_REQUEST};

/// Builds the configured LLM client, or `None` when generation is disabled.
pub fn create_llm_params(config: &AppConfig) -> Result<Option<LLMParams>> {
    let client = match config.llm_provider {
        LlmProvider::None => return Ok(None),
        LlmProvider::OpenAiCompatible => {
            let base_url = config
                .llm_base_url
                .as_deref()
                .ok_or_else(|| anyhow!("LLM base URL missing for openai_compatible provider"))?;
            let api_key = config
                .llm_api_key
                .as_deref()
                .ok_or_else(|| anyhow!("LLM API key missing for openai_compatible provider"))?;
            let openai_config = OpenAIConfig::new()
                .with_api_base(format!("{}/v1", base_url.trim_end_matches('/')))
                .with_api_key(api_key);
            LLMClient::OpenAI(OpenAIClient::with_config(openai_config))
        }
        LlmProvider::Ollama => {
            let base_url = config
                .llm_base_url
                .as_deref()
                .ok_or_else(|| anyhow!("LLM base URL missing for ollama provider"))?;
            let parsed = Url::parse(base_url)
                .map_err(|e| anyhow!("LLM_BASE_URL is not a valid URL: {}", e))?;
            let host = format!(
                "{}://{}",
                parsed.scheme(),
                parsed.host_str().ok_or_else(|| anyhow!("LLM_BASE_URL has no host"))?
            );
            let port = parsed.port().unwrap_or(11434);
            LLMClient::Ollama(Ollama::new(host, port))
        }
    };

    let model = config
        .llm_model
        .clone()
        .ok_or_else(|| anyhow!("LLM model missing for enabled provider"))?;

    Ok(Some(LLMParams {
        llm_client: client,
        model,
        temperature: config.llm_temperature,
        timeout_seconds: config.llm_timeout_seconds,
        max_retries: config.llm_max_retries,
    }))
}

/// Sends one generation request with per-attempt timeout and bounded
/// retries with exponential backoff. Returns `None` once attempts are
/// exhausted; callers fall back rather than propagate.
pub async fn generate_llm_response(system: &str, prompt: &str, params: &LLMParams) -> Option<String> {
    let max_attempts = params.max_retries + 1;
    let mut backoff = 2u64;

    for attempt in 0..max_attempts {
        match timeout(
            Duration::from_secs_f64(params.timeout_seconds),
            generate_once(system, prompt, params),
        )
        .await
        {
            Ok(Ok(text)) if !text.trim().is_empty() => {
                debug!(target: TARGET_LLM_REQUEST, "LLM response received ({} chars)", text.len());
                return Some(text);
            }
            Ok(Ok(_)) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM returned an empty response (attempt {}/{})", attempt + 1, max_attempts);
            }
            Ok(Err(e)) => {
                warn!(target: TARGET_LLM_REQUEST, "Error generating response (attempt {}/{}): {}", attempt + 1, max_attempts, e);
            }
            Err(_) => {
                warn!(target: TARGET_LLM_REQUEST, "LLM request timed out (attempt {}/{})", attempt + 1, max_attempts);
            }
        }

        if attempt + 1 < max_attempts {
            debug!(target: TARGET_LLM_REQUEST, "Backing off for {} seconds before retry", backoff);
            sleep(Duration::from_secs(backoff)).await;
            backoff *= 2;
        }
    }

    error!(target: TARGET_LLM_REQUEST, "No response generated after {} attempts", max_attempts);
    None
}

async fn generate_once(system: &str, prompt: &str, params: &LLMParams) -> Result<String> {
    match &params.llm_client {
        LLMClient::Ollama(ollama) => {
            let mut request = GenerationRequest::new(
                params.model.clone(),
                format!("{}\n\n{}", system, prompt),
            );
            request.options = Some(GenerationOptions::default().temperature(params.temperature));
            let response = ollama
                .generate(request)
                .await
                .map_err(|e| anyhow!("ollama generation failed: {}", e))?;
            Ok(response.response)
        }
        LLMClient::OpenAI(client) => {
            let request = CreateChatCompletionRequestArgs::default()
                .model(params.model.clone())
                .temperature(params.temperature)
                .messages([
                    ChatCompletionRequestSystemMessageArgs::default()
                        .content(system)
                        .build()?
                        .into(),
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(prompt)
                        .build()?
                        .into(),
                ])
                .build()?;
            let response = client.chat().create(request).await?;
            let content = response
                .choices
                .first()
                .and_then(|choice| choice.message.content.clone())
                .unwrap_or_default();
            Ok(content)
        }
    }
}

/// Asks for a title and key insights for one cluster. Budget validation is
/// the caller's job; this enforces only the payload shape and title length.
pub async fn label_cluster(
    params: &LLMParams,
    theme: &str,
    sentences: &[String],
) -> Result<ClusterLabeling> {
    let prompt = prompts::label_cluster_prompt(theme, sentences);
    let raw = generate_llm_response(prompts::SYSTEM_PRODUCT_ANALYST, &prompt, params)
        .await
        .ok_or_else(|| anyhow!("no response from LLM for cluster labeling"))?;
    let labeling: ClusterLabeling = parse_json_payload(&raw)?;
    labeling.cleaned()
}

/// Asks for per-cluster similarities and differences between the cohorts,
/// anchored to the already-decided title and sentiment.
pub async fn summarize_cluster_comparison(
    params: &LLMParams,
    theme: &str,
    cluster_title: &str,
    sentiment: &str,
    baseline_sentences: &[String],
    comparison_sentences: &[String],
) -> Result<ComparisonSummary> {
    let prompt = prompts::summarize_cluster_comparison_prompt(
        theme,
        cluster_title,
        sentiment,
        baseline_sentences,
        comparison_sentences,
    );
    let raw = generate_llm_response(prompts::SYSTEM_PRODUCT_ANALYST, &prompt, params)
        .await
        .ok_or_else(|| anyhow!("no response from LLM for comparison summary"))?;
    let summary: ComparisonSummary = parse_json_payload(&raw)?;
    Ok(summary.cleaned())
}

fn parse_json_payload<T: DeserializeOwned>(raw: &str) -> Result<T> {
    let cleaned = strip_code_fences(raw);
    serde_json::from_str(cleaned.trim()).map_err(|e| anyhow!("invalid JSON payload: {}", e))
}

/// Models sometimes wrap JSON in a markdown fence despite instructions.
fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.starts_with("```") {
        trimmed
            .lines()
            .skip(1)
            .take_while(|line| !line.trim_start().starts_with("```"))
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        trimmed.to_string()
    }
}
