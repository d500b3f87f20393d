//! Tool-using conversational agents.
//!
//! An [`Agent`] drives a chat model through bounded rounds of inference and
//! tool execution. The course generator and the tutor are the same runner
//! with different instructions, tool sets and step ceilings.

mod message;
mod model;
mod runner;
mod tools;

pub use message::{latest_assistant_text, Message, Role, ToolInvocation};
pub use model::{to_request_messages, ChatModel, FinishReason, ModelTurn, OpenAiChatModel, RequestedToolCall};
pub use runner::{Agent, AgentEvent, AgentResponse, ToolCallRecord};
pub use tools::{
    parse_tool_call, tool_definitions, ToolCall, ToolContext, ToolKind, COURSE_GENERATOR_TOOLS, TUTOR_TOOLS,
};

use crate::config::{Prompts, Settings};
use std::sync::Arc;

/// Which agent a request is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRole {
    CourseGenerator,
    Tutor,
}

/// Build a configured agent for the given role.
pub fn build_agent(
    role: AgentRole,
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolContext>,
    settings: &Settings,
    prompts: &Prompts,
) -> Agent {
    match role {
        AgentRole::CourseGenerator => Agent::new(model, tools, COURSE_GENERATOR_TOOLS)
            .with_instructions(&prompts.course_generator_instructions())
            .with_max_steps(settings.agents.course_max_steps),
        AgentRole::Tutor => Agent::new(model, tools, TUTOR_TOOLS)
            .with_instructions(&prompts.tutor_instructions())
            .with_max_steps(settings.agents.tutor_max_steps),
    }
}
