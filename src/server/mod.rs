//! HTTP endpoints for the course generator and the tutor.
//!
//! Both chat endpoints accept `{messages}` and stream the agent's run as
//! server-sent UI message parts. Failures before the stream opens are a 500
//! JSON envelope; failures after it opens are an `error` part.

mod auth;

pub use auth::{Authenticator, StaticTierResolver, TierResolver, TokenAuthenticator, DEV_USER_ID};

use crate::agent::{build_agent, AgentEvent, AgentRole, ChatModel, ToolContext};
use crate::config::{Prompts, Settings};
use crate::content_store::Tier;
use crate::error::{Result, SyllabusError};
use crate::stage::StageTracker;
use crate::streaming::{done_event, normalize_messages, sse_event, ChatRequest, StreamEncoder};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Shared application state.
pub struct AppState {
    pub settings: Settings,
    pub prompts: Prompts,
    pub model: Arc<dyn ChatModel>,
    pub tools: Arc<ToolContext>,
    pub authenticator: Arc<dyn Authenticator>,
    pub tiers: Arc<dyn TierResolver>,
    pub request_timeout: Duration,
}

impl AppState {
    /// State wired with the configuration-backed auth and tier collaborators.
    pub fn new(
        settings: Settings,
        prompts: Prompts,
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolContext>,
    ) -> Self {
        Self {
            authenticator: Arc::new(TokenAuthenticator::new(&settings.auth, &settings.server)),
            tiers: Arc::new(StaticTierResolver::new(&settings.auth)),
            request_timeout: Duration::from_secs(settings.server.request_timeout_secs),
            settings,
            prompts,
            model,
            tools,
        }
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/ai/course-generator", post(course_generator))
        .route("/api/chat", post(tutor_chat))
        .layer(cors)
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    details: String,
}

fn error_response(error: &str, details: impl std::fmt::Display) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error.to_string(),
            details: details.to_string(),
        }),
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn course_generator(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(user_id) = state.authenticator.authenticate(&headers).await else {
        warn!("Course generator called without an authenticated user");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };
    info!("Course generator called by user: {}", user_id);

    match start_run(&state, AgentRole::CourseGenerator, &body) {
        Ok(sse) => sse.into_response(),
        Err(e) => {
            error!("Course generator error: {}", e);
            error_response("Failed to process request", e)
        }
    }
}

async fn tutor_chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(user_id) = state.authenticator.authenticate(&headers).await else {
        warn!("Chat called without an authenticated user");
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    };
    info!("Chat called by user: {}", user_id);

    let tier = state.tiers.tier(&user_id).await;
    if !tier.has_access(Some(Tier::Ultra)) && !state.settings.server.dev_mode {
        return (StatusCode::FORBIDDEN, "Ultra membership required").into_response();
    }

    match start_run(&state, AgentRole::Tutor, &body) {
        Ok(sse) => sse.into_response(),
        Err(e) => {
            error!("Chat error: {}", e);
            error_response("Failed to process chat request", e)
        }
    }
}

/// Parse the request and spawn the agent run, returning its event stream.
fn start_run(
    state: &AppState,
    role: AgentRole,
    body: &[u8],
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, SyllabusError>>>> {
    let request: ChatRequest = serde_json::from_slice(body)?;
    let messages = normalize_messages(&request.messages)?;

    let mut agent = build_agent(
        role,
        state.model.clone(),
        state.tools.clone(),
        &state.settings,
        &state.prompts,
    );
    if role == AgentRole::CourseGenerator {
        agent = agent.with_stage(StageTracker::replay(&messages).stage());
    }

    let (tx, rx) = mpsc::channel::<AgentEvent>(64);
    let timeout = state.request_timeout;

    tokio::spawn(async move {
        let outcome = tokio::time::timeout(timeout, agent.run(&messages, Some(&tx))).await;
        let message = match outcome {
            Ok(Ok(_)) => return,
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("Request timed out after {}s", timeout.as_secs_f32()),
        };
        warn!("Agent run ended with error: {}", message);
        let _ = tx.send(AgentEvent::Error { message }).await;
    });

    let mut encoder = StreamEncoder::new(Uuid::new_v4().to_string());
    let start = sse_event(&encoder.start());

    let parts = ReceiverStream::new(rx).flat_map(move |event| {
        let events: Vec<_> = encoder.encode(event).iter().map(sse_event).collect();
        stream::iter(events)
    });

    let stream = stream::once(async move { start })
        .chain(parts)
        .chain(stream::once(async { Ok(done_event()) }));

    Ok(Sse::new(stream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{FinishReason, Message, ModelTurn, RequestedToolCall};
    use crate::content_store::MemoryContentStore;
    use async_openai::types::ChatCompletionTool;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    /// Model that replays turns in order and records the instructions it saw.
    struct ReplayModel {
        turns: Mutex<Vec<ModelTurn>>,
        delay: Duration,
        instructions: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatModel for ReplayModel {
        async fn complete(
            &self,
            instructions: &str,
            _history: &[Message],
            _tools: &[ChatCompletionTool],
        ) -> Result<ModelTurn> {
            tokio::time::sleep(self.delay).await;
            self.instructions.lock().unwrap().push(instructions.to_string());
            let mut turns = self.turns.lock().unwrap();
            if turns.is_empty() {
                return Err(SyllabusError::Model("no more turns".to_string()));
            }
            Ok(turns.remove(0))
        }

        fn name(&self) -> &str {
            "replay"
        }
    }

    fn replay(turns: Vec<ModelTurn>, delay: Duration) -> Arc<ReplayModel> {
        Arc::new(ReplayModel {
            turns: Mutex::new(turns),
            delay,
            instructions: Mutex::new(Vec::new()),
        })
    }

    async fn spawn_app(model: Arc<ReplayModel>, configure: impl FnOnce(&mut Settings)) -> String {
        let mut settings = Settings::default();
        settings.auth.tokens.insert("tok-free".to_string(), "free-user".to_string());
        settings.auth.tokens.insert("tok-ultra".to_string(), "ultra-user".to_string());
        settings.auth.tiers.insert("ultra-user".to_string(), Tier::Ultra);
        configure(&mut settings);

        let tools = Arc::new(ToolContext::new(Arc::new(MemoryContentStore::new()), &settings));
        let mut state = AppState::new(settings, Prompts::default(), model, tools);
        state.request_timeout = Duration::from_millis(300);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state))).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn data_lines(body: &str) -> Vec<String> {
        body.lines()
            .filter_map(|l| l.strip_prefix("data: "))
            .map(str::to_string)
            .collect()
    }

    fn text(text: &str) -> ModelTurn {
        ModelTurn {
            text: text.to_string(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::stop(),
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_is_rejected() {
        let base = spawn_app(replay(vec![], Duration::ZERO), |_| {}).await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/ai/course-generator", base))
            .json(&json!({ "messages": [] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401);
        assert_eq!(response.text().await.unwrap(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_tutor_requires_ultra_unless_dev_mode() {
        let base = spawn_app(replay(vec![text("Hi!")], Duration::ZERO), |_| {}).await;
        let client = reqwest::Client::new();

        let response = client
            .post(format!("{}/api/chat", base))
            .bearer_auth("tok-free")
            .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 403);
        assert_eq!(response.text().await.unwrap(), "Ultra membership required");

        let response = client
            .post(format!("{}/api/chat", base))
            .bearer_auth("tok-ultra")
            .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let dev_base = spawn_app(replay(vec![text("Hi!")], Duration::ZERO), |s| s.server.dev_mode = true).await;
        let response = client
            .post(format!("{}/api/chat", dev_base))
            .json(&json!({ "messages": [{ "role": "user", "content": "hi" }] }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    #[tokio::test]
    async fn test_course_generator_streams_parts() {
        let model = replay(
            vec![
                ModelTurn {
                    text: String::new(),
                    tool_calls: vec![RequestedToolCall {
                        id: "c1".to_string(),
                        name: "youtubeSearch".to_string(),
                        arguments: r#"{"query":"sql"}"#.to_string(),
                    }],
                    finish_reason: FinishReason::from_raw("tool_calls"),
                },
                text("Research complete! Ready for the next stage?"),
            ],
            Duration::ZERO,
        );
        let base = spawn_app(model.clone(), |_| {}).await;

        let body = reqwest::Client::new()
            .post(format!("{}/api/ai/course-generator", base))
            .bearer_auth("tok-free")
            .json(&json!({ "messages": [
                { "role": "user", "parts": [{ "type": "text", "text": "start" }] },
                { "role": "assistant", "content": "Ready to proceed?" },
                { "role": "user", "content": "next" }
            ] }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        let lines = data_lines(&body);
        assert_eq!(lines.last().map(String::as_str), Some("[DONE]"));

        let parts: Vec<Value> = lines[..lines.len() - 1]
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        let types: Vec<&str> = parts.iter().map(|p| p["type"].as_str().unwrap()).collect();
        assert_eq!(types.first(), Some(&"start"));
        assert!(types.contains(&"tool-input-available"));
        assert!(types.contains(&"tool-output-available"));
        assert!(types.contains(&"text-delta"));

        let finish = parts.iter().find(|p| p["type"] == "finish").unwrap();
        assert_eq!(finish["finishReason"], json!("stop"));

        let output = parts.iter().find(|p| p["type"] == "tool-output-available").unwrap();
        assert_eq!(output["output"]["success"], json!(false));
        assert_eq!(output["output"]["videos"], json!([]));

        // Replayed triggers put the run in the research stage.
        let seen = model.instructions.lock().unwrap();
        assert!(seen[0].contains("Stage 2 of 5"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_500_envelope() {
        let base = spawn_app(replay(vec![], Duration::ZERO), |_| {}).await;
        let response = reqwest::Client::new()
            .post(format!("{}/api/ai/course-generator", base))
            .bearer_auth("tok-free")
            .body("not json")
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 500);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], json!("Failed to process request"));
        assert!(body["details"].as_str().unwrap().contains("JSON"));
    }

    #[tokio::test]
    async fn test_timeout_emits_error_part() {
        let base = spawn_app(replay(vec![text("too late")], Duration::from_secs(5)), |_| {}).await;
        let body = reqwest::Client::new()
            .post(format!("{}/api/ai/course-generator", base))
            .bearer_auth("tok-free")
            .json(&json!({ "messages": [{ "role": "user", "content": "start" }] }))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();

        let lines = data_lines(&body);
        let error = lines
            .iter()
            .filter(|l| l.as_str() != "[DONE]")
            .map(|l| serde_json::from_str::<Value>(l).unwrap())
            .find(|p| p["type"] == "error")
            .unwrap();
        assert!(error["errorText"].as_str().unwrap().contains("timed out"));
        assert_eq!(lines.last().map(String::as_str), Some("[DONE]"));
    }
}
