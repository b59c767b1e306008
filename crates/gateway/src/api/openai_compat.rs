//! OpenAI-compatible route handlers (§6.1). Ported from `adapters/network.py`:
//! `/health`, `/v1/models`, `/v1/chat/completions` (JSON and SSE).

use std::time::Duration;

use async_stream::stream;
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event as SseEvent, Sse};
use axum::response::{IntoResponse, Response};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::json;

use crate::adapters::http::{push_and_wait, HttpAdapterError};
use crate::engine::InvocationOutcome;
use crate::state::AppState;

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

pub async fn list_models(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }
    Json(json!({
        "object": "list",
        "data": [{
            "id": state.config.network.model_name,
            "object": "model",
            "owned_by": "orchestrator",
            "created": 0,
        }],
    }))
    .into_response()
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(error_body(
            "not_found",
            "No route matched. Available routes: GET /health, GET /v1/models, POST /v1/chat/completions",
        )),
    )
        .into_response()
}

/// The typed OpenAI error envelope: `{"error": {"type", "message"}}`.
fn error_body(error_type: &str, message: &str) -> serde_json::Value {
    json!({"error": {"type": error_type, "message": message}})
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// /v1/chat/completions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
pub struct ChatCompletionRequest {
    /// Accepted but otherwise ignored — the orchestrator selects its own
    /// model from routing + config, not from whatever the client names.
    #[allow(dead_code)]
    #[serde(default)]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChatCompletionRequest>,
) -> Response {
    if let Err(resp) = check_auth(&state, &headers) {
        return resp;
    }

    let Some(message) = last_user_message(&req.messages) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_body(
                "invalid_request_error",
                "No user message found in messages array.",
            )),
        )
            .into_response();
    };

    let timeout = Duration::from_secs(state.config.network.request_timeout_s);
    let project_id = state.config.projects.default_project_id.clone();
    let outcome = match push_and_wait(&state, &message, project_id.as_deref(), timeout).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(message)) => {
            return (StatusCode::OK, Json(error_chat_completion(&state, &message)))
                .into_response();
        }
        Err(HttpAdapterError::Timeout) => {
            return (
                StatusCode::GATEWAY_TIMEOUT,
                Json(error_body(
                    "timeout",
                    "Agent did not respond within the configured timeout. The event remains in the queue and will still be processed.",
                )),
            )
                .into_response();
        }
        Err(e) => {
            return (StatusCode::OK, Json(error_chat_completion(&state, &e.to_string())))
                .into_response();
        }
    };

    if req.stream {
        stream_response(state, outcome).into_response()
    } else {
        Json(format_chat_completion(&state, &outcome)).into_response()
    }
}

/// The last `role: "user"` message in the conversation. Everything else —
/// system prompts the client may have sent, prior assistant turns, the
/// `model` field — is ignored; the orchestrator owns its own prompt
/// assembly end to end.
fn last_user_message(messages: &[ChatMessage]) -> Option<String> {
    messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
}

fn check_auth(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    if !state.config.network.require_auth {
        return Ok(());
    }
    let expected = state.config.network.api_key.as_deref().unwrap_or("");
    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected) && !expected.is_empty() {
        Ok(())
    } else {
        let mut resp = (
            StatusCode::UNAUTHORIZED,
            Json(error_body("authentication_error", "Invalid or missing API key.")),
        )
            .into_response();
        resp.headers_mut().insert(
            axum::http::header::WWW_AUTHENTICATE,
            "Bearer realm=\"orchestrator\"".parse().unwrap(),
        );
        Err(resp)
    }
}

/// Flattens `steps` + the final `response` into one assistant message: each
/// step contributes its reasoning and a `[Tool: name | Parameters: json]`
/// marker line, and the terminal response is appended last.
fn build_response_text(outcome: &InvocationOutcome) -> String {
    let mut parts: Vec<String> = Vec::new();
    for step in &outcome.steps {
        parts.push(step.reasoning.clone());
        parts.push(format!(
            "[Tool: {} | Parameters: {}]",
            step.tool, step.parameters
        ));
    }
    parts.push(outcome.response.clone());
    parts.join("\n\n")
}

fn finish_reason(outcome: &InvocationOutcome) -> &'static str {
    if outcome.status == "done" {
        "stop"
    } else {
        "length"
    }
}

fn format_chat_completion(state: &AppState, outcome: &InvocationOutcome) -> serde_json::Value {
    json!({
        "id": format!("chatcmpl-{}", outcome.invocation_id),
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": state.config.network.model_name,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": build_response_text(outcome)},
            "finish_reason": finish_reason(outcome),
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0},
    })
}

fn error_chat_completion(state: &AppState, message: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-error",
        "object": "chat.completion",
        "created": chrono::Utc::now().timestamp(),
        "model": state.config.network.model_name,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": message},
            "finish_reason": "length",
        }],
        "usage": {"prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0},
    })
}

/// Three `data:` chunks (role-open, full content, finish) then `data: [DONE]`.
/// There is no token-by-token streaming — the invocation has already
/// completed by the time this is called, so the "stream" is a fixed-shape
/// courtesy for clients that only speak SSE.
fn stream_response(state: AppState, outcome: InvocationOutcome) -> Sse<impl futures_core::Stream<Item = Result<SseEvent, std::convert::Infallible>>> {
    let chunk_id = format!("chatcmpl-{}", outcome.invocation_id);
    let model = state.config.network.model_name.clone();
    let content = build_response_text(&outcome);
    let reason = finish_reason(&outcome);
    let created = chrono::Utc::now().timestamp();

    let s = stream! {
        let role_chunk = json!({
            "id": chunk_id, "object": "chat.completion.chunk", "created": created, "model": model,
            "choices": [{"index": 0, "delta": {"role": "assistant"}, "finish_reason": null}],
        });
        yield Ok(SseEvent::default().data(role_chunk.to_string()));

        let content_chunk = json!({
            "id": chunk_id, "object": "chat.completion.chunk", "created": created, "model": model,
            "choices": [{"index": 0, "delta": {"content": content}, "finish_reason": null}],
        });
        yield Ok(SseEvent::default().data(content_chunk.to_string()));

        let final_chunk = json!({
            "id": chunk_id, "object": "chat.completion.chunk", "created": created, "model": model,
            "choices": [{"index": 0, "delta": {}, "finish_reason": reason}],
        });
        yield Ok(SseEvent::default().data(final_chunk.to_string()));

        yield Ok(SseEvent::default().data("[DONE]"));
    };
    Sse::new(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Step;

    fn outcome(status: &str, response: &str) -> InvocationOutcome {
        InvocationOutcome {
            invocation_id: "inv_1".into(),
            status: status.into(),
            response: response.into(),
            tool_calls: Vec::new(),
            steps: vec![Step {
                reasoning: "thinking".into(),
                tool: "echo".into(),
                parameters: json!({"x": 1}),
            }],
        }
    }

    #[test]
    fn last_user_message_ignores_trailing_non_user_roles() {
        let messages = vec![
            ChatMessage { role: "user".into(), content: "first".into() },
            ChatMessage { role: "assistant".into(), content: "reply".into() },
            ChatMessage { role: "user".into(), content: "second".into() },
            ChatMessage { role: "system".into(), content: "ignored".into() },
        ];
        assert_eq!(last_user_message(&messages).as_deref(), Some("second"));
    }

    #[test]
    fn last_user_message_none_when_absent() {
        let messages = vec![ChatMessage { role: "system".into(), content: "x".into() }];
        assert!(last_user_message(&messages).is_none());
    }

    #[test]
    fn build_response_text_includes_tool_marker_and_final_response() {
        let text = build_response_text(&outcome("done", "final answer"));
        assert!(text.contains("thinking"));
        assert!(text.contains("[Tool: echo | Parameters:"));
        assert!(text.ends_with("final answer"));
    }

    #[test]
    fn finish_reason_maps_done_to_stop() {
        assert_eq!(finish_reason(&outcome("done", "x")), "stop");
        assert_eq!(finish_reason(&outcome("failed", "x")), "length");
    }

    #[test]
    fn error_body_nests_type_and_message() {
        let body = error_body("invalid_request_error", "No user message found in messages array.");
        assert_eq!(body["error"]["type"], "invalid_request_error");
        assert_eq!(
            body["error"]["message"],
            "No user message found in messages array."
        );
        assert!(body.get("message").is_none(), "message must not sit flat on the body");
    }

    #[tokio::test]
    async fn not_found_uses_the_typed_envelope() {
        let resp = not_found().await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn format_chat_completion_emits_a_real_timestamp() {
        let state = AppState {
            config: std::sync::Arc::new(sa_domain::config::Config::default()),
            store: std::sync::Arc::new(sa_store::Store::open_in_memory().unwrap()),
            waiters: std::sync::Arc::new(crate::state::Waiters::default()),
        };
        let before = chrono::Utc::now().timestamp();
        let body = format_chat_completion(&state, &outcome("done", "hi"));
        let created = body["created"].as_i64().unwrap();
        assert!(created >= before, "created ({created}) should be a current unix timestamp, not 0");
    }
}
