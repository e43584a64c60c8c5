//! Streaming chunk types (`chat.completion.chunk`).
//!
//! The relay forwards upstream chunks as raw JSON; these types describe the frames
//! the gateway produces itself.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One streamed completion chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// Stream identifier, shared by every chunk of one stream
    pub id: String,
    /// Object type
    pub object: String,
    /// Unix timestamp of stream start
    pub created: i64,
    /// Client-facing model identifier
    pub model: String,
    /// Chunk choices
    pub choices: Vec<ChunkChoice>,
}

impl ChatChunk {
    /// Generate a fresh stream identifier (`chatcmpl-<hex>`)
    #[must_use]
    pub fn generate_id() -> String {
        format!("chatcmpl-{}", uuid::Uuid::new_v4().simple())
    }

    /// The synthetic first frame announcing the assistant role
    #[must_use]
    pub fn role_announcement(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion.chunk".to_string(),
            created: Utc::now().timestamp(),
            model: model.into(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: ChunkDelta {
                    role: Some("assistant".to_string()),
                    content: None,
                },
                finish_reason: None,
            }],
        }
    }
}

/// A choice within a chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    pub index: u32,
    /// Partial message fragment
    pub delta: ChunkDelta,
    /// Why generation stopped, on the final chunk
    pub finish_reason: Option<String>,
}

/// Partial message fragment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role, only on the first chunk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Content fragment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}
