//! Syllabus - conversational course generation
//!
//! An incremental, tool-using agent workflow for building LMS courses, plus a
//! tutor agent that answers questions over the published catalogue.
//!
//! # Overview
//!
//! Syllabus lets you:
//! - Walk an author through five stages (discovery, research, structure,
//!   modules, complete) with one agent turn per user message
//! - Research topics on the web and find YouTube videos for lessons
//! - Persist courses, modules and lessons to a content store
//! - Stream agent runs to chat clients as server-sent UI message parts
//!
//! # Architecture
//!
//! - `config` - Settings and agent instruction templates
//! - `content_store` - Document persistence (memory, SQLite, Sanity)
//! - `tools` - Research, video search, course writing, lesson population
//! - `agent` - Chat model abstraction and the multi-step tool loop
//! - `stage` - Workflow stages, trigger words and stage detection
//! - `streaming` - Inbound message normalization and outbound stream parts
//! - `server` - HTTP endpoints
//! - `wizard` - Client-side wizard state
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syllabus::agent::{build_agent, AgentRole, Message, OpenAiChatModel, ToolContext};
//! use syllabus::config::{Prompts, Settings};
//! use syllabus::content_store::create_content_store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let prompts = Prompts::load(None, None)?;
//!     let tools = Arc::new(ToolContext::new(create_content_store(&settings)?, &settings));
//!     let model = Arc::new(OpenAiChatModel::new(&settings.model)?);
//!
//!     let agent = build_agent(AgentRole::CourseGenerator, model, tools, &settings, &prompts);
//!     let response = agent.run(&[Message::user("start")], None).await?;
//!     println!("{}", response.content);
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod content_store;
pub mod error;
pub mod openai;
pub mod server;
pub mod stage;
pub mod streaming;
pub mod tools;
pub mod wizard;

pub use error::{Result, SyllabusError};
