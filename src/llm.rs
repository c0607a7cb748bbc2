//! Port to the external text-generation model.
//!
//! The gateway only ever needs "send these messages, get text back", so the
//! trait stays that small. Tests substitute a mock.

use async_trait::async_trait;

use crate::domain::ChatTurn;
use crate::error::LlmError;

/// A single completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    /// Earlier conversation turns, oldest first. Empty for one-shot prompts.
    pub history: Vec<ChatTurn>,
    pub prompt: String,
    pub temperature: f32,
    /// Ask the provider to constrain output to a JSON object.
    pub json_object: bool,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}
