//! Chat provider abstractions and implementations.
//!
//! The chat extension talks to its backend through [`ChatProvider`], so the
//! Gemini client can be swapped for the mock in tests.

pub mod gemini;
pub mod mock;

use async_trait::async_trait;
use thiserror::Error;

use crate::extensions::gemini::conversation::Message;

/// Error type for provider operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Content filtered")]
    ContentFiltered,

    #[error("Empty response from model")]
    EmptyResponse,

    #[error("Network error: {0}")]
    NetworkError(String),
}

impl ProviderError {
    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotConfigured(_) => "not_configured",
            ProviderError::ApiError(_) => "api_error",
            ProviderError::RateLimited => "rate_limited",
            ProviderError::ContentFiltered => "content_filtered",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::NetworkError(_) => "network_error",
        }
    }
}

/// Generation parameters sent with every chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: i32,
    pub max_output_tokens: i32,
    pub response_mime_type: String,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1000,
            response_mime_type: "text/plain".to_string(),
        }
    }
}

/// One chat turn: prior history, the instruction priming the model, and the new input.
#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system_instruction: Option<&'a str>,
    /// Prior user/model turns, oldest first. Never contains the system entry.
    pub history: &'a [Message],
    pub input: &'a str,
    pub params: &'a GenerationParams,
}

/// Trait for multi-turn text chat backends (e.g., Gemini).
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one user message and return the model's reply text.
    async fn send_message(&self, request: ChatRequest<'_>) -> Result<String, ProviderError>;
}
