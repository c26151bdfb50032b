use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// Who authored a transcript turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocation {
    pub id: Option<String>,
    pub name: String,
    pub arguments: Value,
}

/// One transcript entry. Transcripts are append-only within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Set on assistant turns that requested a tool
    pub tool_call: Option<ToolInvocation>,
    /// Set on tool-result turns; echoes the id of the call being answered
    pub tool_call_id: Option<String>,
}

impl Turn {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn tool_request(call: ToolInvocation) -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            tool_call: Some(call),
            tool_call_id: None,
        }
    }

    pub fn tool_result(call_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::ToolResult,
            content: content.into(),
            tool_call: None,
            tool_call_id: call_id,
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call: None,
            tool_call_id: None,
        }
    }
}

/// Tool description exposed to the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// What the model produced for a tool-enabled turn
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Plain assistant text; no tool requested
    Message(String),
    /// A request to run one tool
    ToolCall(ToolInvocation),
}

/// The language model collaborator.
///
/// Tool-free turns go through a separate method returning plain text, so a
/// caller that disabled tools cannot receive a tool call back.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Request a turn with tool calling allowed
    async fn respond(&self, transcript: &[Turn], tools: &[ToolSpec]) -> Result<ModelReply>;

    /// Request a turn with tool calling disabled
    async fn respond_without_tools(&self, transcript: &[Turn]) -> Result<String>;
}
