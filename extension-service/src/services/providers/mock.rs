//! Mock provider implementation for testing.

use super::{ChatProvider, ChatRequest, ProviderError};
use crate::extensions::gemini::conversation::Message;
use async_trait::async_trait;
use std::sync::Mutex;

/// What the mock does with each message.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Reply with `"Mock reply to: {input}"`.
    Echo,
    /// Fail every call with an API error carrying this message.
    Fail(String),
}

/// A call observed by the mock.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub model: String,
    pub system_instruction: Option<String>,
    pub history: Vec<Message>,
    pub input: String,
}

/// Mock chat provider for testing.
pub struct MockChatProvider {
    behavior: Mutex<MockBehavior>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockChatProvider {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn echo() -> Self {
        Self::new(MockBehavior::Echo)
    }

    pub fn failing(message: &str) -> Self {
        Self::new(MockBehavior::Fail(message.to_string()))
    }

    pub fn set_behavior(&self, behavior: MockBehavior) {
        if let Ok(mut current) = self.behavior.lock() {
            *current = behavior;
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn send_message(&self, request: ChatRequest<'_>) -> Result<String, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                model: request.model.to_string(),
                system_instruction: request.system_instruction.map(str::to_string),
                history: request.history.to_vec(),
                input: request.input.to_string(),
            });
        }

        let behavior = self
            .behavior
            .lock()
            .map(|b| b.clone())
            .unwrap_or(MockBehavior::Echo);

        match behavior {
            MockBehavior::Echo => Ok(format!("Mock reply to: {}", request.input)),
            MockBehavior::Fail(message) => Err(ProviderError::ApiError(message)),
        }
    }
}
