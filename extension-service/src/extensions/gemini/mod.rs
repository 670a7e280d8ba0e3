//! Chat extension: a plain-HTML front end for Gemini.
//!
//! GET renders the session's recent history. POST sends the submitted text to the
//! selected model and renders the updated history. Upstream failures are shown as
//! chat messages rather than HTTP errors.

pub mod conversation;

use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Form, Router,
};
use serde::Deserialize;
use service_core::error::AppError;
use tower_sessions::Session;

use crate::config::ModelOption;
use crate::services::metrics::record_chat_completion;
use crate::services::providers::{ChatProvider, ChatRequest, GenerationParams};
use crate::AppState;
use conversation::{ChatSession, SYSTEM_PROMPT};

pub const DOMAIN: &str = "gemini.google.com";

const SESSION_KEY: &str = "gemini.chat";

#[derive(Template)]
#[template(path = "gemini_chat.html")]
pub struct ChatTemplate<'a> {
    pub models: &'a [ModelOption],
    pub selected_model: &'a str,
    pub output: String,
}

#[derive(Deserialize)]
pub struct CommandForm {
    pub command: Option<String>,
    pub model: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        get(chat_page).post(submit_command).fallback(not_found),
    )
}

pub async fn chat_page(
    State(state): State<AppState>,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    let chat = load_chat(&session, &state).await?;
    Ok(render_chat(&state, &chat))
}

pub async fn submit_command(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CommandForm>,
) -> Result<impl IntoResponse, AppError> {
    let command = form
        .command
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("missing form field: command")))?;
    let model = form
        .model
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("missing form field: model")))?;

    if !state.settings.gemini.is_known_model(&model) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "unknown model: {}",
            model
        )));
    }

    let mut chat = load_chat(&session, &state).await?;
    if chat.select_model(&model) {
        tracing::info!(model = %model, "Model changed, conversation history cleared");
    }

    converse(state.chat_provider.as_ref(), &mut chat, &command).await;

    session
        .insert(SESSION_KEY, &chat)
        .await
        .map_err(|e| AppError::SessionError(e.to_string()))?;

    Ok(render_chat(&state, &chat))
}

/// Run one chat turn against `provider`, recording the outcome in `chat`.
///
/// Always appends exactly two entries (plus the system prompt on a fresh history).
pub async fn converse(provider: &dyn ChatProvider, chat: &mut ChatSession, command: &str) {
    chat.history.seed_system_prompt(SYSTEM_PROMPT);

    let params = GenerationParams::default();
    let result = provider
        .send_message(ChatRequest {
            model: &chat.model,
            system_instruction: chat.history.system_prompt(),
            history: chat.history.replay(),
            input: command,
            params: &params,
        })
        .await;

    let reply = match result {
        Ok(text) => {
            record_chat_completion("ok");
            text
        }
        Err(e) => {
            tracing::warn!(model = %chat.model, error = %e, "Chat completion failed");
            record_chat_completion(e.kind());
            format!("An error occurred: {}", e)
        }
    };

    chat.history.record_exchange(command, reply);
}

async fn load_chat(session: &Session, state: &AppState) -> Result<ChatSession, AppError> {
    let stored = session
        .get::<ChatSession>(SESSION_KEY)
        .await
        .map_err(|e| AppError::SessionError(e.to_string()))?;

    Ok(stored.unwrap_or_else(|| ChatSession::new(state.settings.gemini.default_model.clone())))
}

fn render_chat(state: &AppState, chat: &ChatSession) -> Response {
    ChatTemplate {
        models: &state.settings.gemini.models,
        selected_model: &chat.model,
        output: chat.history.render_recent(),
    }
    .into_response()
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}
