//! Payload builder.
//!
//! The upstream always receives exactly two messages, system then user. Only the
//! last user turn is forwarded; earlier turns are not concatenated.

use gateway_core::{ChatRequest, GatewayError, GatewayResult, MessageRole};
use gateway_routing::RouteEntry;
use serde::Serialize;

/// Temperature used when neither the request nor the route sets one
pub const FALLBACK_TEMPERATURE: f32 = 0.7;
/// top_p used when neither the request nor the route sets one
pub const FALLBACK_TOP_P: f32 = 1.0;
/// top_k used when neither the request nor the route sets one
pub const FALLBACK_TOP_K: u32 = 40;

/// Body of one upstream chat-completions call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamPayload {
    /// Backend model path
    pub model: String,
    /// System message, then user message
    pub messages: Vec<UpstreamMessage>,
    /// Resolved temperature
    pub temperature: f32,
    /// Resolved top_p
    pub top_p: f32,
    /// Resolved top_k
    pub top_k: u32,
    /// Ask the upstream for an event stream
    pub stream: bool,
}

/// A message as the upstream sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpstreamMessage {
    /// Message role
    pub role: MessageRole,
    /// Message text
    pub content: String,
}

/// Merge a request with its route.
///
/// System prompt precedence: the request's last system message, then
/// `system_prompt` (an injected override, ignored when empty), then the route
/// default, then the empty string.
///
/// # Errors
/// Returns `BadRequest` when the request has no user message.
pub fn build_payload(
    request: &ChatRequest,
    route: &RouteEntry,
    system_prompt: Option<&str>,
) -> GatewayResult<UpstreamPayload> {
    let user = request
        .last_user_message()
        .ok_or_else(|| GatewayError::bad_request("No user message provided."))?;

    let system = match request.last_system_message() {
        Some(message) => message.text(),
        None => system_prompt
            .filter(|p| !p.is_empty())
            .or_else(|| route.system_prompt())
            .unwrap_or_default(),
    };

    let defaults = route.defaults;

    Ok(UpstreamPayload {
        model: route.upstream_model_path.clone(),
        messages: vec![
            UpstreamMessage {
                role: MessageRole::System,
                content: system.to_string(),
            },
            UpstreamMessage {
                role: MessageRole::User,
                content: user.text().to_string(),
            },
        ],
        temperature: request
            .temperature
            .or(defaults.temperature)
            .unwrap_or(FALLBACK_TEMPERATURE),
        top_p: request
            .top_p
            .or(defaults.top_p)
            .unwrap_or(FALLBACK_TOP_P),
        top_k: request.top_k.or(defaults.top_k).unwrap_or(FALLBACK_TOP_K),
        stream: request.stream,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway_core::{ChatMessage, ErrorKind};
    use gateway_routing::GenerationDefaults;

    fn route(system_prompt: &str, defaults: GenerationDefaults) -> RouteEntry {
        RouteEntry {
            model_id: "expert".to_string(),
            upstream_url: "http://localhost:8080/v1/chat/completions".to_string(),
            upstream_model_path: "/models/expert.gguf".to_string(),
            default_system_prompt: system_prompt.to_string(),
            defaults,
        }
    }

    fn request(messages: Vec<ChatMessage>) -> ChatRequest {
        let mut builder = ChatRequest::builder().model("expert");
        for message in messages {
            builder = builder.message(message);
        }
        builder.build().expect("request")
    }

    #[test]
    fn test_two_messages_system_then_last_user() {
        let request = request(vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
        ]);

        let payload = build_payload(&request, &route("", GenerationDefaults::default()), None)
            .expect("payload");

        assert_eq!(payload.model, "/models/expert.gguf");
        assert_eq!(payload.messages.len(), 2);
        assert_eq!(payload.messages[0].role, MessageRole::System);
        assert_eq!(payload.messages[0].content, "");
        assert_eq!(payload.messages[1].role, MessageRole::User);
        assert_eq!(payload.messages[1].content, "second");
    }

    #[test]
    fn test_no_user_message_is_bad_request() {
        let request = request(vec![ChatMessage::system("only system")]);
        let err = build_payload(&request, &route("", GenerationDefaults::default()), None)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn test_system_prompt_precedence() {
        let route = route("route default", GenerationDefaults::default());

        let explicit = request(vec![ChatMessage::system("explicit"), ChatMessage::user("hi")]);
        let payload = build_payload(&explicit, &route, Some("override")).expect("payload");
        assert_eq!(payload.messages[0].content, "explicit");

        let plain = request(vec![ChatMessage::user("hi")]);
        let payload = build_payload(&plain, &route, Some("override")).expect("payload");
        assert_eq!(payload.messages[0].content, "override");

        let payload = build_payload(&plain, &route, Some("")).expect("payload");
        assert_eq!(payload.messages[0].content, "route default");

        let payload = build_payload(&plain, &route, None).expect("payload");
        assert_eq!(payload.messages[0].content, "route default");
    }

    #[test]
    fn test_explicit_empty_system_message_still_wins() {
        let mut system = ChatMessage::system("");
        system.content = None;
        let request = request(vec![system, ChatMessage::user("hi")]);

        let route = route("route default", GenerationDefaults::default());

        let payload = build_payload(&request, &route, None).expect("payload");
        assert_eq!(payload.messages[0].content, "");
    }

    #[test]
    fn test_sampling_precedence() {
        let route_defaults = GenerationDefaults {
            temperature: Some(0.2),
            top_p: None,
            top_k: Some(10),
        };
        let route = route("", route_defaults);

        let mut request = request(vec![ChatMessage::user("hi")]);
        let payload = build_payload(&request, &route, None).expect("payload");
        assert!((payload.temperature - 0.2).abs() < f32::EPSILON);
        assert!((payload.top_p - FALLBACK_TOP_P).abs() < f32::EPSILON);
        assert_eq!(payload.top_k, 10);

        request.temperature = Some(0.0);
        request.top_p = Some(0.5);
        request.top_k = Some(1);
        let payload = build_payload(&request, &route, None).expect("payload");
        assert!(payload.temperature.abs() < f32::EPSILON);
        assert!((payload.top_p - 0.5).abs() < f32::EPSILON);
        assert_eq!(payload.top_k, 1);
    }

    #[test]
    fn test_fallbacks_when_nothing_is_set() {
        let request = request(vec![ChatMessage::user("hi")]);
        let payload = build_payload(&request, &route("", GenerationDefaults::default()), None)
            .expect("payload");

        assert!((payload.temperature - FALLBACK_TEMPERATURE).abs() < f32::EPSILON);
        assert!((payload.top_p - FALLBACK_TOP_P).abs() < f32::EPSILON);
        assert_eq!(payload.top_k, FALLBACK_TOP_K);
    }

    #[test]
    fn test_build_is_idempotent() {
        let request = request(vec![ChatMessage::system("s"), ChatMessage::user("u")]);
        let route = route("d", GenerationDefaults::default());

        let a = build_payload(&request, &route, Some("o")).expect("payload");
        let b = build_payload(&request, &route, Some("o")).expect("payload");
        assert_eq!(a, b);
    }

    #[test]
    fn test_wire_shape() {
        let request = request(vec![ChatMessage::user("Hello")]);
        let payload = build_payload(&request, &route("", GenerationDefaults::default()), None)
            .expect("payload");
        let json = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(json["model"], "/models/expert.gguf");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Hello");
        assert_eq!(json["top_k"], 40);
        assert_eq!(json["stream"], false);
    }
}
