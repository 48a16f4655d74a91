//! HTTP chat front end
//!
//! JSON API plus an embedded single-page chat client. Each browser tab
//! keeps its own session id; the server holds transcripts in a
//! `SessionStore`.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::agent::{Agent, SessionStore};
use crate::error::Error;

/// Embedded chat page
const INDEX_HTML: &str = include_str!("../../static/index.html");

const EXIT_NOTICE: &str = "To end the session, simply close this browser tab.";

// ---- App State ----

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub sessions: Arc<dyn SessionStore>,
    pub help_text: Arc<str>,
    /// Upper bound on one chat request
    pub request_timeout: Duration,
}

// ---- Error Handling ----

/// An error rendered as a chat reply
pub struct AppError {
    error: Error,
    response_time: f64,
}

impl AppError {
    fn new(error: Error, started: Instant) -> Self {
        AppError {
            error,
            response_time: seconds(started),
        }
    }
}

/// HTTP status for an error surfaced to the browser
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::Provider(_) | Error::Http(_) | Error::Fetch(_) => StatusCode::BAD_GATEWAY,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        if status.is_server_error() {
            error!("Chat request failed: {}", self.error);
        }
        let body = Json(serde_json::json!({
            "response": format!("An error occurred: {}", self.error),
            "response_time": self.response_time,
        }));
        (status, body).into_response()
    }
}

// ---- Request / Response Types ----

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    /// Seconds, two decimals
    pub response_time: f64,
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Serialize)]
struct HelpResponse {
    help_text: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    sessions: u64,
}

fn seconds(started: Instant) -> f64 {
    (started.elapsed().as_secs_f64() * 100.0).round() / 100.0
}

/// `exit`, `quit` or `q`, with or without a leading slash
pub fn is_exit_command(message: &str) -> bool {
    matches!(
        message.trim().trim_start_matches('/').to_ascii_lowercase().as_str(),
        "exit" | "quit" | "q"
    )
}

// ---- Handlers ----

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let started = Instant::now();
    let message = request.message.trim();

    if message.is_empty() {
        return Err(AppError::new(
            Error::InvalidInput("Please enter a message.".to_string()),
            started,
        ));
    }

    let (session_id, session) = state.sessions.get_or_create(request.session_id.as_deref()).await;

    if is_exit_command(message) {
        return Ok(Json(ChatResponse {
            response: EXIT_NOTICE.to_string(),
            response_time: seconds(started),
            session_id,
        }));
    }

    info!("Chat request for session {}", session_id);

    // One request per session at a time
    let mut session = session.lock().await;
    let reply = state.agent.respond(&mut session, message);
    let answer = tokio::time::timeout(state.request_timeout, reply)
        .await
        .map_err(|_| {
            Error::Timeout(format!(
                "No answer within {}s",
                state.request_timeout.as_secs()
            ))
        })
        .and_then(|result| result)
        .map_err(|e| AppError::new(e, started))?;

    Ok(Json(ChatResponse {
        response: answer,
        response_time: seconds(started),
        session_id,
    }))
}

async fn clear(
    State(state): State<AppState>,
    Json(request): Json<ClearRequest>,
) -> Json<MessageResponse> {
    if let Some(id) = request.session_id.as_deref() {
        if let Some(session) = state.sessions.get(id).await {
            session.lock().await.clear();
            info!("Cleared session {}", id);
        }
    }

    Json(MessageResponse {
        message: "Conversation history cleared.".to_string(),
    })
}

async fn help(State(state): State<AppState>) -> Json<HelpResponse> {
    Json(HelpResponse {
        help_text: state.help_text.to_string(),
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        sessions: state.sessions.count().await,
    })
}

// ---- Router ----

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/chat", post(chat))
        .route("/clear", post(clear))
        .route("/help", get(help))
        .route("/health", get(health));

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{
        ChatCompletionResponse, Choice, CompletionService, GenerationOptions, LoopConfig,
        MemorySessionStore, ToolDefinition, Turn,
    };
    use crate::tools::ToolRegistry;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    /// Answers with the last user message, or fails with a fixed error
    struct EchoLlm {
        fail_with: Option<fn() -> Error>,
        delay: Duration,
    }

    #[async_trait]
    impl CompletionService for EchoLlm {
        fn model(&self) -> &str {
            "echo"
        }

        async fn complete(
            &self,
            messages: Vec<Turn>,
            _tools: Vec<ToolDefinition>,
            _options: GenerationOptions,
        ) -> crate::Result<ChatCompletionResponse> {
            tokio::time::sleep(self.delay).await;
            if let Some(fail) = self.fail_with {
                return Err(fail());
            }
            let last = messages.last().map(|t| t.content.clone()).unwrap_or_default();
            Ok(ChatCompletionResponse {
                id: "gen".into(),
                model: "echo".into(),
                choices: vec![Choice {
                    index: 0,
                    message: Turn::assistant(format!("echo: {} ({} turns)", last, messages.len())),
                    finish_reason: Some("stop".into()),
                }],
                usage: None,
            })
        }
    }

    fn app_with(llm: EchoLlm, request_timeout: Duration) -> (Router, Arc<MemorySessionStore>) {
        let sessions = Arc::new(MemorySessionStore::new(100, Duration::from_secs(60), 40));
        let agent = Agent::new(Arc::new(llm), ToolRegistry::new(), LoopConfig::default());
        let state = AppState {
            agent: Arc::new(agent),
            sessions: sessions.clone(),
            help_text: Arc::from("Available tools:\n  - search"),
            request_timeout,
        };
        (build_router(state), sessions)
    }

    fn app() -> (Router, Arc<MemorySessionStore>) {
        app_with(
            EchoLlm {
                fail_with: None,
                delay: Duration::ZERO,
            },
            Duration::from_secs(5),
        )
    }

    async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("exit"));
        assert!(is_exit_command(" /Quit "));
        assert!(is_exit_command("q"));
        assert!(!is_exit_command("quite"));
    }

    #[tokio::test]
    async fn test_chat_keeps_session() {
        let (app, sessions) = app();

        let (status, first) = post_json(&app, "/api/chat", json!({"message": "hello"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["response"], "echo: hello (1 turns)");
        assert!(first["response_time"].as_f64().unwrap() >= 0.0);
        let session_id = first["session_id"].as_str().unwrap().to_string();

        let (_, second) = post_json(
            &app,
            "/api/chat",
            json!({"message": "again", "session_id": session_id}),
        )
        .await;
        assert_eq!(second["response"], "echo: again (3 turns)");
        assert_eq!(second["session_id"], session_id.as_str());

        let session = sessions.get(&session_id).await.unwrap();
        assert_eq!(session.lock().await.len(), 4);
    }

    #[tokio::test]
    async fn test_exit_does_not_call_agent() {
        let (app, sessions) = app();
        let (status, body) =
            post_json(&app, "/api/chat", json!({"message": "quit", "session_id": "tab-1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["response"], EXIT_NOTICE);
        assert!(sessions.get("tab-1").await.unwrap().lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_empties_session() {
        let (app, sessions) = app();
        post_json(&app, "/api/chat", json!({"message": "hello", "session_id": "tab-2"})).await;

        let (status, body) = post_json(&app, "/api/clear", json!({"session_id": "tab-2"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Conversation history cleared.");
        assert!(sessions.get("tab-2").await.unwrap().lock().await.is_empty());

        // Unknown sessions clear without error
        let (status, _) = post_json(&app, "/api/clear", json!({"session_id": "nope"})).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_help_and_health() {
        let (app, _) = app();
        let (status, body) = get_json(&app, "/api/help").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["help_text"].as_str().unwrap().contains("search"));

        post_json(&app, "/api/chat", json!({"message": "hi", "session_id": "tab-3"})).await;
        let (status, body) = get_json(&app, "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["sessions"], 1);
    }

    #[tokio::test]
    async fn test_index_page() {
        let (app, _) = app();
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/api/chat"));
    }

    #[tokio::test]
    async fn test_llm_errors_map_to_status() {
        let (app, sessions) = app_with(
            EchoLlm {
                fail_with: Some(|| Error::RateLimit("quota".into())),
                delay: Duration::ZERO,
            },
            Duration::from_secs(5),
        );
        let (status, body) =
            post_json(&app, "/api/chat", json!({"message": "hi", "session_id": "tab-4"})).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert!(body["response"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: Rate limit exceeded"));
        // The user turn stays, nothing else
        assert_eq!(sessions.get("tab-4").await.unwrap().lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let (app, _) = app_with(
            EchoLlm {
                fail_with: None,
                delay: Duration::from_secs(5),
            },
            Duration::from_millis(100),
        );
        let (status, body) = post_json(&app, "/api/chat", json!({"message": "slow"})).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert!(body["response"].as_str().unwrap().contains("Timeout"));
    }

    #[tokio::test]
    async fn test_empty_message_is_bad_request() {
        let (app, _) = app();
        let (status, _) = post_json(&app, "/api/chat", json!({"message": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_for(&Error::Provider("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(&Error::Config("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
