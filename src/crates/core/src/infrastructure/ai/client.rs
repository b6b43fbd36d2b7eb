//! Generation service client
//!
//! Opens the incremental feed for one conversational turn.

use crate::util::errors::{AtelierError, AtelierResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use log::debug;
use serde::Serialize;
use serde_json::{json, Value};

pub type ByteStream = BoxStream<'static, Result<Bytes, anyhow::Error>>;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One message as sent upstream.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

/// A structured-output capability offered to the model.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub messages: Vec<WireMessage>,
    pub tools: Vec<ToolDefinition>,
    pub thinking_budget: Option<u32>,
}

impl GenerationRequest {
    pub fn to_body(&self) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": self.system,
            "messages": self.messages,
            "stream": true,
        });
        if !self.tools.is_empty() {
            body["tools"] = json!(self.tools);
        }
        if let Some(budget) = self.thinking_budget {
            body["thinking"] = json!({ "type": "enabled", "budget_tokens": budget });
        }
        body
    }
}

/// Upstream generation service seam.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Open the feed. A non-success status is an error.
    async fn open_stream(&self, request: &GenerationRequest) -> AtelierResult<ByteStream>;
}

/// Anthropic Messages API backend.
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for AnthropicClient {
    async fn open_stream(&self, request: &GenerationRequest) -> AtelierResult<ByteStream> {
        debug!(
            "Opening generation stream: model={}, messages={}",
            request.model,
            request.messages.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("accept", "text/event-stream")
            .json(&request.to_body())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AtelierError::provider(format!(
                "generation service returned {}: {}",
                status, body
            )));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(anyhow::Error::from))
            .boxed())
    }
}
