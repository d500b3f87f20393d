//! Chat model abstraction and the OpenAI-compatible implementation.

use super::message::{Message, Role};
use crate::config::ModelSettings;
use crate::error::{Result, SyllabusError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionTool, ChatCompletionToolType, CreateChatCompletionRequestArgs, FunctionCall,
};
use async_openai::Client;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A tool call requested by the model, arguments still unparsed.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// Why the model stopped, as a unified code plus the provider's raw value.
///
/// Unified codes: `stop`, `length`, `content-filter`, `tool-calls`, `error`,
/// `other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishReason {
    pub unified: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl FinishReason {
    pub fn new(unified: &str, raw: Option<&str>) -> Self {
        Self {
            unified: unified.to_string(),
            raw: raw.map(str::to_string),
        }
    }

    pub fn stop() -> Self {
        Self::new("stop", None)
    }

    /// Map a provider finish reason (`stop`, `tool_calls`, ...) to a unified one.
    pub fn from_raw(raw: &str) -> Self {
        let unified = match raw {
            "stop" => "stop",
            "length" => "length",
            "content_filter" => "content-filter",
            "tool_calls" | "function_call" => "tool-calls",
            "error" => "error",
            _ => "other",
        };
        Self::new(unified, Some(raw))
    }
}

/// One round of model output.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelTurn {
    pub text: String,
    pub tool_calls: Vec<RequestedToolCall>,
    pub finish_reason: FinishReason,
}

/// A chat model that can request tool calls.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one inference over the full history.
    async fn complete(
        &self,
        instructions: &str,
        history: &[Message],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelTurn>;

    /// Model identifier, for logs.
    fn name(&self) -> &str;
}

/// Chat model served over an OpenAI-compatible chat completions API.
pub struct OpenAiChatModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatModel {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        Ok(Self {
            client: create_client(settings)?,
            model: settings.model.clone(),
        })
    }
}

fn build_err(e: impl std::fmt::Display) -> SyllabusError {
    SyllabusError::Agent(e.to_string())
}

/// Convert normalized history into request messages.
///
/// Resolved invocations become an assistant tool-call message followed by
/// one tool message per result. Unresolved invocations are dropped since the
/// API requires every call to be answered.
pub fn to_request_messages(
    instructions: &str,
    history: &[Message],
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(instructions.to_string())
            .build()
            .map_err(build_err)?
            .into(),
    ];

    for message in history {
        let resolved: Vec<_> = message
            .tool_invocations
            .iter()
            .filter(|inv| inv.is_resolved())
            .collect();

        match message.role {
            Role::User => {
                messages.push(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(message.text.clone())
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
            Role::Assistant => {
                let mut args = ChatCompletionRequestAssistantMessageArgs::default();
                if !message.text.is_empty() {
                    args.content(message.text.clone());
                }
                if !resolved.is_empty() {
                    args.tool_calls(
                        resolved
                            .iter()
                            .map(|inv| ChatCompletionMessageToolCall {
                                id: inv.call_id.clone(),
                                r#type: ChatCompletionToolType::Function,
                                function: FunctionCall {
                                    name: inv.tool_name.clone(),
                                    arguments: inv.input.to_string(),
                                },
                            })
                            .collect::<Vec<_>>(),
                    );
                } else if message.text.is_empty() {
                    continue;
                }
                messages.push(args.build().map_err(build_err)?.into());
            }
            Role::Tool => {}
        }

        for inv in resolved {
            if let Some(result) = &inv.result {
                messages.push(
                    ChatCompletionRequestToolMessageArgs::default()
                        .tool_call_id(inv.call_id.clone())
                        .content(result.payload.to_string())
                        .build()
                        .map_err(build_err)?
                        .into(),
                );
            }
        }
    }

    Ok(messages)
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(
        &self,
        instructions: &str,
        history: &[Message],
        tools: &[ChatCompletionTool],
    ) -> Result<ModelTurn> {
        let mut request = CreateChatCompletionRequestArgs::default();
        request
            .model(&self.model)
            .messages(to_request_messages(instructions, history)?);
        if !tools.is_empty() {
            request.tools(tools.to_vec());
        }
        let request = request.build().map_err(build_err)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SyllabusError::Model(format!("Chat completion failed: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SyllabusError::Model("No response from model".to_string()))?;

        let tool_calls: Vec<RequestedToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| RequestedToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        let finish_reason = match choice.finish_reason {
            Some(reason) => {
                let raw = serde_json::to_value(reason)?;
                FinishReason::from_raw(raw.as_str().unwrap_or_default())
            }
            None => FinishReason::stop(),
        };

        debug!(
            "Model {} returned {} tool calls, finish reason {}",
            self.model,
            tool_calls.len(),
            finish_reason.unified
        );

        Ok(ModelTurn {
            text: choice.message.content.unwrap_or_default(),
            tool_calls,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
