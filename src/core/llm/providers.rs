use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::LlmConfig;
use crate::error::{MangoDeskError, Result};
use super::summarizer::{
    build_summary_prompt, classify_provider_error, Summarizer, SummaryRequest, SummaryResponse,
};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Factory function to create the appropriate summarizer based on config
pub fn create_summarizer(config: &LlmConfig) -> Result<Box<dyn Summarizer>> {
    match config.provider.as_str() {
        "gemini" => Ok(Box::new(GeminiProvider::new(config)?)),
        "openai" => Ok(Box::new(OpenAiProvider::new(config)?)),
        _ => Err(MangoDeskError::Config(format!(
            "Unsupported LLM provider: {}",
            config.provider
        ))),
    }
}

fn require_api_key(config: &LlmConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| {
        MangoDeskError::Config("API key required for external LLM providers".to_string())
    })
}

fn require_models(config: &LlmConfig) -> Result<Vec<String>> {
    if config.models.is_empty() {
        return Err(MangoDeskError::Config(
            "At least one model must be configured".to_string(),
        ));
    }
    Ok(config.models.clone())
}

/// Google Gemini provider (REST `generateContent`)
pub struct GeminiProvider {
    config: LlmConfig,
    api_key: String,
    models: Vec<String>,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            api_key: require_api_key(config)?,
            models: require_models(config)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            config: config.clone(),
            client: reqwest::Client::new(),
        })
    }

    async fn call_model(&self, model: &str, prompt: &str, max_tokens: u32) -> Result<ModelOutcome> {
        let payload = json!({
            "contents": [
                { "parts": [ { "text": prompt } ] }
            ],
            "generationConfig": {
                "maxOutputTokens": max_tokens,
                "temperature": self.config.temperature.unwrap_or(0.3)
            }
        });

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini request failed: {}", e);
                classify_provider_error(None, &e.to_string())
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let detail = response.text().await.unwrap_or_default();
            return Ok(ModelOutcome::Unavailable(detail));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            error!("Gemini API error {}: {}", status, detail);
            return Err(classify_provider_error(Some(status.as_u16()), &detail));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| classify_provider_error(None, &e.to_string()))?;

        let text = data["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = data["promptFeedback"]["blockReason"]
                .as_str()
                .map(|r| format!("blocked: {}", r))
                .unwrap_or_else(|| "empty response".to_string());
            return Err(classify_provider_error(Some(status.as_u16()), &reason));
        }

        let tokens_used = data["usageMetadata"]["totalTokenCount"]
            .as_u64()
            .unwrap_or(0) as u32;

        Ok(ModelOutcome::Generated(SummaryResponse {
            summary: text.trim().to_string(),
            tokens_used,
            model: model.to_string(),
        }))
    }
}

enum ModelOutcome {
    Generated(SummaryResponse),
    Unavailable(String),
}

#[async_trait]
impl Summarizer for GeminiProvider {
    async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse> {
        let prompt = build_summary_prompt(&request);
        let max_tokens = request
            .max_tokens
            .or(self.config.max_tokens)
            .unwrap_or(1000);

        let mut last_error = String::from("no models configured");
        for model in &self.models {
            match self.call_model(model, &prompt, max_tokens).await? {
                ModelOutcome::Generated(response) => {
                    debug!("Summary generated with {}", model);
                    return Ok(response);
                }
                ModelOutcome::Unavailable(detail) => {
                    warn!("Model {} not available, trying next...", model);
                    last_error = detail;
                }
            }
        }

        error!("No available Gemini models found. Last error: {}", last_error);
        Err(classify_provider_error(Some(404), &last_error))
    }

    fn provider_name(&self) -> &str {
        "Google Gemini"
    }

    fn model_name(&self) -> &str {
        &self.models[0]
    }
}

/// OpenAI chat completions provider
pub struct OpenAiProvider {
    config: LlmConfig,
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            api_key: require_api_key(config)?,
            model: require_models(config)?.remove(0),
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OPENAI_BASE_URL.to_string()),
            config: config.clone(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl Summarizer for OpenAiProvider {
    async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse> {
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "You are an expert meeting notes summarizer. Produce clear, well-organized, professional summaries."
                },
                {
                    "role": "user",
                    "content": build_summary_prompt(&request)
                }
            ],
            "max_tokens": request.max_tokens.or(self.config.max_tokens).unwrap_or(1000),
            "temperature": self.config.temperature.unwrap_or(0.3)
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!("OpenAI request failed: {}", e);
                classify_provider_error(None, &e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API error {}: {}", status, error_text);
            return Err(classify_provider_error(Some(status.as_u16()), &error_text));
        }

        let response_data: Value = response
            .json()
            .await
            .map_err(|e| classify_provider_error(None, &e.to_string()))?;

        let content = response_data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| classify_provider_error(None, "missing completion content"))?;

        Ok(SummaryResponse {
            summary: content.trim().to_string(),
            tokens_used: response_data["usage"]["total_tokens"].as_u64().unwrap_or(0) as u32,
            model: response_data["model"]
                .as_str()
                .unwrap_or(&self.model)
                .to_string(),
        })
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
