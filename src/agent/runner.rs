//! Agent runner with a bounded tool-calling loop.

use super::message::{Message, ToolInvocation};
use super::model::{ChatModel, FinishReason, RequestedToolCall};
use super::tools::{parse_tool_call, tool_definitions, ToolContext, ToolKind};
use crate::error::Result;
use crate::stage::Stage;
use crate::tools::ToolResult;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Progress events emitted while the agent runs.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StepStarted {
        step: usize,
    },
    TextDelta {
        text: String,
    },
    ToolCallRequested {
        call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolResult {
        call_id: String,
        tool_name: String,
        result: ToolResult,
    },
    StepFinished {
        step: usize,
        finish_reason: FinishReason,
    },
    Finished {
        finish_reason: FinishReason,
        steps: usize,
        hit_step_limit: bool,
    },
    Error {
        message: String,
    },
}

/// Agent that runs inference and tool rounds until the model stops.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolContext>,
    enabled_tools: Vec<ToolKind>,
    max_steps: usize,
    instructions: String,
    stage: Option<Stage>,
}

impl Agent {
    /// Create a new agent with the given model, tool context and tool set.
    pub fn new(model: Arc<dyn ChatModel>, tools: Arc<ToolContext>, enabled_tools: &[ToolKind]) -> Self {
        Self {
            model,
            tools,
            enabled_tools: enabled_tools.to_vec(),
            max_steps: 20,
            instructions: String::new(),
            stage: None,
        }
    }

    /// Set the agent's instructions.
    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    /// Set the maximum number of model rounds per run.
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    /// Tell the model which workflow stage the conversation is in.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    fn instructions(&self) -> String {
        match self.stage {
            Some(stage) => format!("{}\n\n{}", self.instructions, stage.context()),
            None => self.instructions.clone(),
        }
    }

    async fn emit(events: Option<&mpsc::Sender<AgentEvent>>, event: AgentEvent) {
        if let Some(tx) = events {
            if tx.send(event).await.is_err() {
                debug!("Event receiver dropped");
            }
        }
    }

    /// Run the agent over a conversation history.
    ///
    /// Stops when a round requests no tools, or after `max_steps` rounds. The
    /// step ceiling is not an error: the text produced so far is returned
    /// with `hit_step_limit` set.
    pub async fn run(
        &self,
        history: &[Message],
        events: Option<&mpsc::Sender<AgentEvent>>,
    ) -> Result<AgentResponse> {
        let instructions = self.instructions();
        let definitions = tool_definitions(&self.enabled_tools);

        let mut conversation = history.to_vec();
        let mut new_messages = Vec::new();
        let mut texts: Vec<String> = Vec::new();
        let mut tool_calls_made = Vec::new();
        let mut finish_reason = FinishReason::stop();

        for step in 1..=self.max_steps {
            debug!("Agent step {} of {}", step, self.max_steps);
            Self::emit(events, AgentEvent::StepStarted { step }).await;

            let turn = self
                .model
                .complete(&instructions, &conversation, &definitions)
                .await?;
            finish_reason = turn.finish_reason.clone();

            if !turn.text.is_empty() {
                Self::emit(events, AgentEvent::TextDelta { text: turn.text.clone() }).await;
                texts.push(turn.text.clone());
            }

            if turn.tool_calls.is_empty() {
                let message = Message::assistant(turn.text);
                conversation.push(message.clone());
                new_messages.push(message);
                Self::emit(events, AgentEvent::StepFinished { step, finish_reason: finish_reason.clone() }).await;
                Self::emit(
                    events,
                    AgentEvent::Finished {
                        finish_reason: finish_reason.clone(),
                        steps: step,
                        hit_step_limit: false,
                    },
                )
                .await;

                return Ok(AgentResponse {
                    content: texts.join("\n\n"),
                    messages: new_messages,
                    tool_calls: tool_calls_made,
                    steps: step,
                    finish_reason,
                    hit_step_limit: false,
                });
            }

            for call in &turn.tool_calls {
                Self::emit(
                    events,
                    AgentEvent::ToolCallRequested {
                        call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        input: input_value(&call.arguments),
                    },
                )
                .await;
            }

            // Every call in the round runs concurrently; results keep request order.
            let records = join_all(turn.tool_calls.iter().map(|call| self.execute_tool_call(call))).await;

            let mut invocations = Vec::with_capacity(records.len());
            for (call, record) in turn.tool_calls.iter().zip(records) {
                Self::emit(
                    events,
                    AgentEvent::ToolResult {
                        call_id: call.id.clone(),
                        tool_name: call.name.clone(),
                        result: record.result.clone(),
                    },
                )
                .await;
                invocations.push(ToolInvocation {
                    call_id: call.id.clone(),
                    tool_name: call.name.clone(),
                    input: input_value(&call.arguments),
                    result: Some(record.result.clone()),
                });
                tool_calls_made.push(record);
            }

            let message = Message::assistant(turn.text).with_invocations(invocations);
            conversation.push(message.clone());
            new_messages.push(message);

            Self::emit(events, AgentEvent::StepFinished { step, finish_reason: finish_reason.clone() }).await;
        }

        warn!(
            "Agent stopped at the step ceiling ({}) with tool calls still pending",
            self.max_steps
        );
        Self::emit(
            events,
            AgentEvent::Finished {
                finish_reason: finish_reason.clone(),
                steps: self.max_steps,
                hit_step_limit: true,
            },
        )
        .await;

        Ok(AgentResponse {
            content: texts.join("\n\n"),
            messages: new_messages,
            tool_calls: tool_calls_made,
            steps: self.max_steps,
            finish_reason,
            hit_step_limit: true,
        })
    }

    /// Validate and execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, call: &RequestedToolCall) -> ToolCallRecord {
        info!("Agent calling tool: {} with args: {}", call.name, call.arguments);

        let result = match parse_tool_call(&call.name, &call.arguments) {
            Ok(tool) if self.enabled_tools.contains(&tool.kind()) => self.tools.execute(&tool).await,
            Ok(_) => ToolResult::failure(format!("Tool '{}' is not available to this agent", call.name)),
            Err(e) => {
                warn!("Rejected tool call {}: {}", call.name, e);
                ToolResult::failure(e.to_string())
            }
        };

        ToolCallRecord {
            name: call.name.clone(),
            arguments: call.arguments.clone(),
            result,
        }
    }
}

/// Parsed tool input for display; unparseable arguments are kept verbatim.
fn input_value(arguments: &str) -> Value {
    serde_json::from_str(arguments).unwrap_or_else(|_| Value::String(arguments.to_string()))
}

/// Response from an agent run.
#[derive(Debug)]
pub struct AgentResponse {
    /// Text from every round, joined.
    pub content: String,
    /// Assistant messages produced by this run, in order.
    pub messages: Vec<Message>,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model rounds used.
    pub steps: usize,
    pub finish_reason: FinishReason,
    pub hit_step_limit: bool,
}

/// Record of a tool call made by the agent.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    pub result: ToolResult,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}
