use serde::{Deserialize, Serialize};

use crate::config::LimitsConfig;
use crate::error::{MangoDeskError, Result};

/// Words an instruction may not contain
const BLOCKED_INSTRUCTION_TERMS: &[&str] = &["hack", "exploit", "bypass", "unauthorized"];

/// Request for an AI-generated summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRequest {
    /// Transcript text to summarize
    pub content: String,

    /// The user's natural-language instruction
    pub instruction: String,

    /// Response length cap, falls back to the provider config
    pub max_tokens: Option<u32>,
}

/// Generated summary returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryResponse {
    pub summary: String,
    pub tokens_used: u32,
    pub model: String,
}

/// Trait for generative-AI providers that can summarize transcripts
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    /// Produce a summary of the request content following its instruction
    async fn summarize(&self, request: SummaryRequest) -> Result<SummaryResponse>;

    /// Get the provider name (e.g., "Google Gemini")
    fn provider_name(&self) -> &str;

    /// Get the preferred model name
    fn model_name(&self) -> &str;
}

/// Build the text sent to the model
pub fn build_summary_prompt(request: &SummaryRequest) -> String {
    let mut prompt = String::new();

    prompt.push_str("You are an expert meeting notes summarizer. Create a clear, structured summary of the content below following the user's instructions.\n\n");

    prompt.push_str("CONTENT TO SUMMARIZE:\n");
    prompt.push_str(&request.content);
    prompt.push_str("\n\n");

    prompt.push_str("USER INSTRUCTIONS:\n");
    prompt.push_str(&request.instruction);
    prompt.push_str("\n\n");

    prompt.push_str("SUMMARY:\n");
    prompt
}

/// Reject blank, overlong or disallowed summary instructions
pub fn validate_instruction(instruction: &str, limits: &LimitsConfig) -> Result<()> {
    let invalid = || MangoDeskError::Validation("Invalid prompt provided".to_string());

    if instruction.trim().is_empty() {
        return Err(invalid());
    }
    if instruction.chars().count() > limits.max_prompt_chars {
        return Err(invalid());
    }

    let lower = instruction.to_lowercase();
    if BLOCKED_INSTRUCTION_TERMS.iter().any(|term| lower.contains(term)) {
        return Err(invalid());
    }

    Ok(())
}

/// Map a raw provider failure onto the message shown to API callers
pub fn classify_provider_error(status: Option<u16>, detail: &str) -> MangoDeskError {
    let lower = detail.to_lowercase();

    let message = if status == Some(401) || status == Some(403) || lower.contains("api key") {
        "AI service not properly configured"
    } else if status == Some(429) || lower.contains("quota") {
        "AI service quota exceeded"
    } else if lower.contains("safety") || lower.contains("content policy") || lower.contains("blocked") {
        "Content violates AI service policies"
    } else {
        "Failed to generate summary. Please try again."
    };

    MangoDeskError::Llm(message.to_string())
}
