//! Language-model synthesis over OpenAI-compatible chat completion APIs.
//!
//! - [`Provider`] / [`ModelConfig`]: provider selection and credentials
//! - [`ChatClient`]: streaming `/chat/completions` client
//! - [`ChatSynthesizer`]: the review writer, implementing the core `Synthesizer` port

mod client;
mod provider;
mod synthesizer;

pub use client::{ChatClient, ChatMessage, ChatRequest};
pub use provider::{ModelConfig, Provider};
pub use synthesizer::{ChatSynthesizer, REVIEWER_PROMPT};
