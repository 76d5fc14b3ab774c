//! Streaming client for OpenAI-compatible `/chat/completions` endpoints.

use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use reviewgen_core::{SynthesisEvent, SynthesisEvents};
use reviewgen_shared::{Result, ReviewError};

const USER_AGENT: &str = concat!("reviewgen/", env!("CARGO_PKG_VERSION"));

/// Connect timeout only; a review can legitimately stream for minutes.
const CONNECT_TIMEOUT_SECS: u64 = 15;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// HTTP client bound to one provider endpoint and API key.
#[derive(Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ChatClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ReviewError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|_| ReviewError::config("API key contains invalid header characters"))?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        Ok(headers)
    }

    /// Start a streaming completion.
    ///
    /// Fails up front on transport errors and non-success statuses. After
    /// that, each `data:` payload becomes one [`SynthesisEvent`]; `[DONE]`
    /// ends the stream and malformed payloads end it with a parse error.
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn stream_chat(&self, request: &ChatRequest) -> Result<SynthesisEvents> {
        let url = format!("{}/chat/completions", self.base_url);
        let mut body = request.clone();
        body.stream = true;

        debug!(%url, messages = body.messages.len(), "chat completion request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReviewError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ReviewError::http("chat completions", status.as_u16(), text.trim()));
        }

        let mut bytes = response.bytes_stream();

        let events = async_stream::try_stream! {
            let mut lines = LineBuffer::default();
            let mut done = false;

            'read: while let Some(chunk) = bytes.next().await {
                let chunk = chunk
                    .map_err(|e| ReviewError::Network(format!("completion stream interrupted: {e}")))?;

                for line in lines.push(&chunk) {
                    match parse_sse_line(&line)? {
                        SseLine::Event(event) => yield event,
                        SseLine::Done => {
                            done = true;
                            break 'read;
                        }
                        SseLine::Skip => {}
                    }
                }
            }

            if let Some(line) = lines.finish().filter(|_| !done) {
                if let SseLine::Event(event) = parse_sse_line(&line)? {
                    yield event;
                }
            }
        };

        Ok(Box::pin(events))
    }
}

// ---------------------------------------------------------------------------
// Event-stream parsing
// ---------------------------------------------------------------------------

/// Splits a byte stream into lines across chunk boundaries.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line));
        }
        lines
    }

    /// Whatever is left after the body ends without a trailing newline.
    fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(decode_line(&rest))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

#[derive(Debug, PartialEq)]
enum SseLine {
    Event(SynthesisEvent),
    Done,
    Skip,
}

fn parse_sse_line(line: &str) -> Result<SseLine> {
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments, `event:` and `id:` fields.
        return Ok(SseLine::Skip);
    };

    let data = data.trim();
    if data.is_empty() {
        return Ok(SseLine::Skip);
    }
    if data == "[DONE]" {
        return Ok(SseLine::Done);
    }

    let chunk: ChatChunk = serde_json::from_str(data)
        .map_err(|e| ReviewError::parse(format!("malformed completion chunk: {e}")))?;

    if let Some(error) = chunk.error {
        return Err(ReviewError::Synthesis(error.message));
    }

    let event = match chunk.choices.into_iter().next() {
        Some(choice) => SynthesisEvent {
            content: choice.delta.content,
            finish_reason: choice.finish_reason,
        },
        None => SynthesisEvent::control(None),
    };
    Ok(SseLine::Event(event))
}
