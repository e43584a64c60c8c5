//! Response types for the gateway.

use crate::request::ChatMessage;
use serde::{Deserialize, Serialize};

fn chat_completion_object() -> String {
    "chat.completion".to_string()
}

/// Non-streaming chat completion response.
///
/// Decoded once from the upstream reply and handed to the client unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Completion identifier assigned by the upstream
    pub id: String,
    /// Object type
    #[serde(default = "chat_completion_object")]
    pub object: String,
    /// Unix timestamp of creation
    pub created: i64,
    /// Model reported by the upstream
    pub model: String,
    /// Completion choices in upstream order
    pub choices: Vec<Choice>,
    /// Token accounting
    pub usage: Usage,
    /// Backend fingerprint, when the upstream reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatResponse {
    /// Content of the first choice, if any
    #[must_use]
    pub fn content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Choice index
    pub index: u32,
    /// Generated message
    pub message: ChatMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt
    pub prompt_tokens: u32,
    /// Tokens in the completion
    pub completion_tokens: u32,
    /// Total tokens
    pub total_tokens: u32,
}

/// Entry of the `/v1/models` listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelObject {
    /// Model identifier
    pub id: String,
    /// Object type
    pub object: String,
    /// Unix timestamp shared by every entry of one listing
    pub created: i64,
    /// Owner label
    pub owned_by: String,
}

impl ModelObject {
    /// Create a model entry
    #[must_use]
    pub fn new(id: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            object: "model".to_string(),
            created,
            owned_by: "llm-wrapper".to_string(),
        }
    }
}

/// `/v1/models` response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse {
    /// Object type
    pub object: String,
    /// Model entries
    pub data: Vec<ModelObject>,
}

impl ModelsResponse {
    /// Create a listing from model entries
    #[must_use]
    pub fn new(data: Vec<ModelObject>) -> Self {
        Self {
            object: "list".to_string(),
            data,
        }
    }
}
