use super::fragment::StreamFragment;
use serde::Deserialize;

/// Only the discriminator; the full payload is parsed per type.
#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type")]
    pub event_type: String,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlockStart {
    pub content_block: ContentBlock,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "thinking")]
    Thinking,
    #[serde(rename = "redacted_thinking")]
    RedactedThinking,
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "tool_use")]
    ToolUse { id: String, name: String },
    #[serde(other)]
    Unknown,
}

impl ContentBlockStart {
    pub fn into_fragment(self) -> Option<StreamFragment> {
        match self.content_block {
            ContentBlock::Thinking | ContentBlock::RedactedThinking => {
                Some(StreamFragment::ThinkingStart)
            }
            ContentBlock::ToolUse { id, name } => Some(StreamFragment::ToolStart { id, name }),
            ContentBlock::Text | ContentBlock::Unknown => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ContentBlockDelta {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Delta {
    #[serde(rename = "thinking_delta")]
    ThinkingDelta { thinking: String },
    #[serde(rename = "text_delta")]
    TextDelta { text: String },
    #[serde(rename = "input_json_delta")]
    InputJsonDelta { partial_json: String },
    #[serde(rename = "signature_delta")]
    SignatureDelta {},
    #[serde(other)]
    Unknown,
}

impl ContentBlockDelta {
    /// `Ok(None)` for deltas that carry nothing the relay uses.
    pub fn into_fragment(self) -> Result<Option<StreamFragment>, String> {
        match self.delta {
            Delta::ThinkingDelta { thinking } => Ok(Some(StreamFragment::ThinkingDelta(thinking))),
            Delta::TextDelta { text } => Ok(Some(StreamFragment::TextDelta(text))),
            Delta::InputJsonDelta { partial_json } => {
                Ok(Some(StreamFragment::ToolInputDelta(partial_json)))
            }
            Delta::SignatureDelta {} => Ok(None),
            Delta::Unknown => Err("Unsupported delta type".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnthropicSSEError {
    pub error: AnthropicSSEErrorDetails,
}

#[derive(Debug, Deserialize)]
pub struct AnthropicSSEErrorDetails {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

impl From<AnthropicSSEErrorDetails> for String {
    fn from(value: AnthropicSSEErrorDetails) -> Self {
        format!("{}: {}", value.error_type, value.message)
    }
}

/// What a single `data:` line of the feed amounts to.
#[derive(Debug, PartialEq, Eq)]
pub enum FeedLine {
    Fragment(StreamFragment),
    /// Well-formed but irrelevant (ping, message_start, block stop, usage...).
    Ignored,
    /// `message_stop`: nothing more will follow.
    Stop,
    /// The provider aborted the stream.
    Error(String),
}

/// Parse the JSON payload of one feed line.
///
/// Returns `Err` for malformed lines; callers drop those and keep reading.
pub fn parse_feed_line(data: &str) -> Result<FeedLine, String> {
    let envelope: EventEnvelope =
        serde_json::from_str(data).map_err(|e| format!("{e}, data: {data}"))?;

    match envelope.event_type.as_str() {
        "content_block_start" => {
            let start: ContentBlockStart =
                serde_json::from_str(data).map_err(|e| format!("{e}, data: {data}"))?;
            Ok(start
                .into_fragment()
                .map(FeedLine::Fragment)
                .unwrap_or(FeedLine::Ignored))
        }
        "content_block_delta" => {
            let delta: ContentBlockDelta =
                serde_json::from_str(data).map_err(|e| format!("{e}, data: {data}"))?;
            Ok(delta
                .into_fragment()?
                .map(FeedLine::Fragment)
                .unwrap_or(FeedLine::Ignored))
        }
        "message_stop" => Ok(FeedLine::Stop),
        "error" => {
            let sse_error: AnthropicSSEError =
                serde_json::from_str(data).map_err(|e| format!("{e}, data: {data}"))?;
            Ok(FeedLine::Error(String::from(sse_error.error)))
        }
        _ => Ok(FeedLine::Ignored),
    }
}
