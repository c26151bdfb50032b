//! LLM module: model collaborator trait, HTTP client, and chat payload adapter
//!
//! This module provides:
//! - `ChatModel`: the seam the conversation engine and summarizer talk to
//! - `LlmClientConfig`, `LlmClient` for OpenAI-compatible Chat Completions backends
//! - adapter helpers turning transcripts into chat messages and replies into `ModelReply`

mod adapter;
mod client;
mod model;

pub use adapter::{
    extract_text_from_chat, parse_reply, parse_tool_calls_from_chat, tools_to_chat,
    transcript_to_messages,
};
pub use client::{LlmClient, LlmClientConfig};
pub use model::{ChatModel, ModelReply, Role, ToolInvocation, ToolSpec, Turn};
