//! HTTP API server for the course generator and tutor.

use crate::agent::{ChatModel, OpenAiChatModel, ToolContext};
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::content_store::create_content_store;
use crate::server::{router, AppState};
use std::sync::Arc;

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Serve, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'syllabus doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let store = create_content_store(&settings)?;
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let model: Arc<dyn ChatModel> = Arc::new(OpenAiChatModel::new(&settings.model)?);
    let tools = Arc::new(ToolContext::new(store, &settings));

    let research_ready = tools.researcher.is_configured();
    let video_ready = tools.videos.is_configured();
    let dev_mode = settings.server.dev_mode;
    let model_name = settings.model.model.clone();

    let state = Arc::new(AppState::new(settings, prompts, model, tools));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Syllabus API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Model", &model_name);
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Course generator", "POST /api/ai/course-generator");
    Output::kv("Tutor", "POST /api/chat");
    println!();
    if !research_ready {
        Output::warning("TAVILY_API_KEY not set: web research will return fallback suggestions.");
    }
    if !video_ready {
        Output::warning("YOUTUBE_API_KEY not set: video search will report errors.");
    }
    if dev_mode {
        Output::warning("Development mode: unauthenticated requests are allowed.");
    }
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}
