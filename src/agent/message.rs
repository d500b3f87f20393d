//! Normalized conversation messages.

use crate::tools::ToolResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a message. System text is never accepted from callers; the
/// agent supplies its own instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// One tool call and, once resolved, its result.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub call_id: String,
    pub tool_name: String,
    pub input: Value,
    pub result: Option<ToolResult>,
}

impl ToolInvocation {
    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_invocations: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_invocations: Vec::new(),
        }
    }

    pub fn with_invocations(mut self, invocations: Vec<ToolInvocation>) -> Self {
        self.tool_invocations = invocations;
        self
    }
}

/// Text of the most recent assistant message, if any.
pub fn latest_assistant_text(history: &[Message]) -> Option<&str> {
    history
        .iter()
        .rev()
        .find(|m| m.role == Role::Assistant)
        .map(|m| m.text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_assistant_text() {
        let history = vec![
            Message::user("start"),
            Message::assistant("first"),
            Message::user("next"),
            Message::assistant("second"),
            Message::user("approve"),
        ];
        assert_eq!(latest_assistant_text(&history), Some("second"));
        assert_eq!(latest_assistant_text(&history[..1]), None);
    }
}
