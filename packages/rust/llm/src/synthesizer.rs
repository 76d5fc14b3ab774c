//! The review writer.

use async_trait::async_trait;
use tracing::{info, instrument};

use reviewgen_core::{SynthesisEvents, Synthesizer};
use reviewgen_shared::{LlmConfig, Result};

use crate::client::{ChatClient, ChatMessage, ChatRequest};
use crate::provider::ModelConfig;

/// System prompt for the reviewer persona.
pub const REVIEWER_PROMPT: &str = "\
You are ReviewMaster-X, an expert product reviewer combining technical knowledge with \
consumer advocacy. You write balanced reviews, explain technical specifications clearly, \
synthesize multiple sources and give a clear recommendation.

The user message is a JSON object with `product_name` and `sources`. Each source has a \
`title`, `url`, optional `summary` and optional Markdown `content`. Base every claim on \
these sources and attribute opinions to them.

Write the review in Markdown, 800 to 1200 words, with this structure:

# Product Review: <engaging title>

## Introduction
A hook and context about the product.

## Overview
Product category, manufacturer and positioning.

## Key Features & Specifications
Main features and technical specs in accessible language, related to real-world benefits.

## Performance & User Experience
Real-world performance and what users and experts report.

## Pros
- At least three strengths.

## Cons
- At least three weaknesses.

## Value for Money
Price analysis and value assessment. Mention alternatives where the sources do.

## Verdict
A clear recommendation and who should buy it.

## Sources
Every source URL used, one per line.

Output only the review.";

/// [`Synthesizer`] that streams a review from a chat completion model.
#[derive(Debug, Clone)]
pub struct ChatSynthesizer {
    client: ChatClient,
    model: ModelConfig,
}

impl ChatSynthesizer {
    pub fn new(client: ChatClient, model: ModelConfig) -> Self {
        Self { client, model }
    }

    /// Resolve `[llm]` settings and read the API key from the environment.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let model = ModelConfig::resolve(config)?;
        let api_key = model.api_key()?;
        let client = ChatClient::new(&model.base_url, &api_key)?;
        Ok(Self::new(client, model))
    }

    pub fn model(&self) -> &ModelConfig {
        &self.model
    }

    fn build_request(&self, request: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.model.clone(),
            messages: vec![ChatMessage::system(REVIEWER_PROMPT), ChatMessage::user(request)],
            stream: true,
            temperature: self.model.temperature,
        }
    }
}

#[async_trait]
impl Synthesizer for ChatSynthesizer {
    #[instrument(skip_all, fields(provider = %self.model.provider, model = %self.model.model))]
    async fn synthesize(&self, request: &str) -> Result<SynthesisEvents> {
        info!(request_bytes = request.len(), "starting review synthesis");
        self.client.stream_chat(&self.build_request(request)).await
    }
}
