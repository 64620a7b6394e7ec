use axum::{
    Form, Json, Router,
    extract::{DefaultBodyLimit, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::{ChatError, CompletionError};
use crate::llm::{ChatCompletionsClient, CompletionClient, LlmSettings};
use crate::session::{ConversationSession, SessionStore, ViewEntry};

/// Cookie carrying the browser-session id.
pub const SESSION_COOKIE: &str = "chatmaven_session";

/// Largest request body accepted.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, settings: LlmSettings) -> anyhow::Result<()> {
    info!(
        name: "llm.config.loaded",
        base_url = %settings.base_url,
        model = %settings.model,
        provider = ?settings.provider,
        "LLM configuration loaded"
    );

    let completions: Arc<dyn CompletionClient> = Arc::new(ChatCompletionsClient::new(settings)?);
    let state = AppState::new(Arc::clone(&config), completions)?;

    spawn_session_sweeper(
        state.sessions.clone(),
        config.sessions.idle_timeout(),
        config.sessions.sweep_interval(),
    );

    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    // Zero means no timeout; a year keeps the layer type fixed.
    let timeout_duration = match state.config.server.request_timeout_secs {
        0 => Duration::from_secs(365 * 24 * 60 * 60),
        secs => Duration::from_secs(secs),
    };

    Router::new()
        .route("/", get(index_handler))
        .route("/chat", post(chat_form_handler))
        .route("/healthz", get(|| async { "ok" }))
        .route("/api/chat", post(api_chat))
        .route("/api/sessions", post(api_create_session))
        .route("/api/sessions/{id}", delete(api_delete_session))
        .route("/api/sessions/{id}/messages", get(api_get_messages))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                match tokio::time::timeout(timeout_duration, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// End sessions that have been idle longer than `idle_timeout`.
fn spawn_session_sweeper(sessions: SessionStore, idle_timeout: Duration, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let removed = sessions.cleanup_expired_with_timeout(idle_timeout);
            if removed > 0 {
                info!(removed, remaining = sessions.len(), "Expired sessions removed");
            }
        }
    });
}

// ─────────────────────────────────────────────────────────────────────────────
// Error Mapping
// ─────────────────────────────────────────────────────────────────────────────

/// HTTP status for a session error.
fn status_for(err: &ChatError) -> StatusCode {
    match err {
        ChatError::EmptyInput => StatusCode::UNPROCESSABLE_ENTITY,
        ChatError::SubmissionPending => StatusCode::CONFLICT,
        ChatError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ChatError::CompletionRequestFailure(CompletionError::RateLimited) => {
            StatusCode::TOO_MANY_REQUESTS
        }
        ChatError::CompletionRequestFailure(CompletionError::Timeout) => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ChatError::CompletionRequestFailure(_) => StatusCode::BAD_GATEWAY,
        ChatError::MissingCredential | ChatError::InvalidSetting { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            code: self.code(),
        };
        (status_for(&self), Json(body)).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Form body for the chat page.
#[derive(Debug, Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

/// Resolve the browser session from its cookie, starting one if needed.
fn session_from_cookie(state: &AppState, jar: CookieJar) -> (ConversationSession, CookieJar) {
    if let Some(session) = jar
        .get(SESSION_COOKIE)
        .and_then(|cookie| state.sessions.get(cookie.value()))
    {
        return (session, jar);
    }

    let session = state.sessions.create();
    let cookie = Cookie::build((SESSION_COOKIE, session.id().to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (session, jar.add(cookie))
}

fn render_page(
    state: &AppState,
    session: &ConversationSession,
    error: Option<&str>,
) -> Result<Html<String>, (StatusCode, String)> {
    state
        .pages
        .render(&session.render_view(), error)
        .map(Html)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to render page");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to render page".to_string())
        })
}

/// Submit on a separate task so a dropped request cannot cancel the call.
async fn submit_detached(
    state: &AppState,
    session: &ConversationSession,
    text: String,
) -> Result<String, ChatError> {
    match session.spawn_submit(Arc::clone(&state.completions), text).await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(session_id = %session.id(), error = %e, "Submit task failed");
            Err(ChatError::CompletionRequestFailure(CompletionError::Network(e.to_string())))
        }
    }
}

/// GET / - Chat page for the current browser session.
async fn index_handler(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), (StatusCode, String)> {
    let (session, jar) = session_from_cookie(&state, jar);
    let page = render_page(&state, &session, None)?;
    Ok((jar, page))
}

/// POST /chat - Form submission from the chat page.
async fn chat_form_handler(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ChatForm>,
) -> Response {
    let (session, jar) = session_from_cookie(&state, jar);

    match submit_detached(&state, &session, form.message).await {
        Ok(_) | Err(ChatError::EmptyInput) => (jar, Redirect::to("/")).into_response(),
        Err(err) => {
            let status = status_for(&err);
            match render_page(&state, &session, Some(&err.to_string())) {
                Ok(page) => (status, jar, page).into_response(),
                Err(failure) => failure.into_response(),
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// Request body for chat API.
#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// User message content.
    message: String,
    /// Optional session ID (creates new if not provided).
    #[serde(default)]
    session_id: Option<String>,
}

/// Response from chat API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Session ID for this conversation.
    pub session_id: String,
    /// Assistant reply.
    pub reply: String,
}

/// Session info returned on creation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID.
    pub session_id: String,
    /// Number of visible messages.
    pub message_count: usize,
}

/// POST /api/chat - Submit a message and wait for the reply.
async fn api_chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ChatError> {
    tracing::info!(
        session_id = ?req.session_id,
        message_length = req.message.len(),
        "Received chat request"
    );

    let session = match req.session_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => state
            .sessions
            .get(id)
            .ok_or_else(|| ChatError::SessionNotFound(id.to_string()))?,
        None => state.sessions.create(),
    };

    let reply = submit_detached(&state, &session, req.message).await?;

    Ok(Json(ChatResponse {
        session_id: session.id().to_string(),
        reply,
    }))
}

/// POST /api/sessions - Create a new session.
async fn api_create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionInfo>) {
    let session = state.sessions.create();
    (
        StatusCode::CREATED,
        Json(SessionInfo {
            session_id: session.id().to_string(),
            message_count: session.message_count(),
        }),
    )
}

/// DELETE /api/sessions/:id - End a session.
async fn api_delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.sessions.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// GET /api/sessions/:id/messages - Visible transcript entries.
async fn api_get_messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ViewEntry>>, ChatError> {
    state
        .sessions
        .get(&id)
        .map(|session| Json(session.render_view()))
        .ok_or(ChatError::SessionNotFound(id))
}
