//! LLM integration - OpenAI-compatible chat completions
//!
//! This module provides:
//! - The `TextGenerator` seam graph synthesis depends on
//! - An HTTP client for chat completions implementing it
//! - Request/response types and per-call token usage
//! - Multi-turn chat message assembly

mod chat;
mod client;
mod generator;
mod types;

pub use chat::{CHAT_HISTORY_TURNS, ChatTurn, chat_messages};
pub use client::{DEFAULT_BASE_URL, LlmClient, LlmClientBuilder};
pub use generator::TextGenerator;
pub use types::{
    ChatRequest, ChatResponse, Choice, FinishReason, Generation, Message, MessageRole,
    TokenUsage, Usage,
};
