//! Generative-AI integration for transcript summarization
//!
//! This module provides a trait-based architecture for plugging different
//! LLM providers behind a single summarization interface.

mod providers;
mod summarizer;

pub use providers::{create_summarizer, GeminiProvider, OpenAiProvider};
pub use summarizer::{
    build_summary_prompt, classify_provider_error, validate_instruction, Summarizer,
    SummaryRequest, SummaryResponse,
};
