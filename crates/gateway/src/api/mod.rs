//! HTTP front-end (C9): the OpenAI-compatible wire surface.

pub mod openai_compat;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(openai_compat::health))
        .route("/v1/models", get(openai_compat::list_models))
        .route("/v1/chat/completions", post(openai_compat::chat_completions))
        .fallback(openai_compat::not_found)
        .with_state(state)
}
