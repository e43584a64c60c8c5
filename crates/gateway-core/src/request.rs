//! Request types for the gateway.
//!
//! These mirror the OpenAI chat-completion request. Function and tool payloads are
//! carried as opaque JSON; the gateway validates their combination but never looks inside.

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAI-compatible chat completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Client-facing model identifier, resolved against the routing table
    pub model: String,

    /// Ordered conversation messages
    pub messages: Vec<ChatMessage>,

    /// Legacy function declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub functions: Option<Vec<Value>>,

    /// Legacy function call directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,

    /// Tool declarations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Value>>,

    /// Tool choice directive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<Value>,

    /// Sampling temperature; `None` means "use the route default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Nucleus sampling; `None` means "use the route default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Top-k sampling; `None` means "use the route default"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,

    /// Enable streaming response
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Create a new builder for `ChatRequest`
    #[must_use]
    pub fn builder() -> ChatRequestBuilder {
        ChatRequestBuilder::default()
    }

    /// The last message with the user role, if any
    #[must_use]
    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == MessageRole::User)
    }

    /// The last message with the system role, if any
    #[must_use]
    pub fn last_system_message(&self) -> Option<&ChatMessage> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::System)
    }

    /// Check the request shape before it is routed.
    ///
    /// # Errors
    /// Returns `BadRequest` when both `functions` and `tools` are declared or when
    /// no user message is present.
    pub fn validate(&self) -> GatewayResult<()> {
        if has_entries(self.functions.as_deref()) && has_entries(self.tools.as_deref()) {
            return Err(GatewayError::bad_request(
                "Cannot provide both 'functions' and 'tools'",
            ));
        }

        if self.last_user_message().is_none() {
            return Err(GatewayError::bad_request("No user message provided."));
        }

        Ok(())
    }
}

fn has_entries(list: Option<&[Value]>) -> bool {
    list.is_some_and(|l| !l.is_empty())
}

/// Builder for `ChatRequest`
#[derive(Debug, Default)]
pub struct ChatRequestBuilder {
    model: Option<String>,
    messages: Vec<ChatMessage>,
    functions: Option<Vec<Value>>,
    tools: Option<Vec<Value>>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<u32>,
    stream: bool,
}

impl ChatRequestBuilder {
    /// Set the model
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Add a message
    #[must_use]
    pub fn message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// Set legacy function declarations
    #[must_use]
    pub fn functions(mut self, functions: Vec<Value>) -> Self {
        self.functions = Some(functions);
        self
    }

    /// Set tool declarations
    #[must_use]
    pub fn tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Set the temperature
    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set top_p
    #[must_use]
    pub fn top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set top_k
    #[must_use]
    pub fn top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Enable streaming
    #[must_use]
    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Build the request without validating it.
    ///
    /// # Errors
    /// Returns error if the model is missing
    pub fn build(self) -> GatewayResult<ChatRequest> {
        let model = self
            .model
            .ok_or_else(|| GatewayError::bad_request("model is required"))?;

        Ok(ChatRequest {
            model,
            messages: self.messages,
            functions: self.functions,
            function_call: None,
            tools: self.tools,
            tool_choice: None,
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            stream: self.stream,
        })
    }
}

/// Chat message with role and optional content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message author
    pub role: MessageRole,

    /// Text content of the message
    #[serde(default)]
    pub content: Option<String>,

    /// Optional name of the author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Legacy function call made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,

    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<Value>>,
}

impl ChatMessage {
    /// Create a message with the given role and text
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
            tool_calls: None,
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Text content, empty when absent
    #[must_use]
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Legacy function result message
    Function,
    /// Tool response message
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Function => write!(f, "function"),
            Self::Tool => write!(f, "tool"),
        }
    }
}
