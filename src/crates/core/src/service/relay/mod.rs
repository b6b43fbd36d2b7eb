//! Streaming relay service

pub mod accumulator;
pub mod prompt;
pub mod relay;
pub mod types;

pub use accumulator::{TurnAccumulator, TurnOutcome, ARTIFACT_TOOL_NAME};
pub use prompt::{artifact_tool, DEFAULT_SYSTEM_PROMPT};
pub use relay::{RelaySettings, StreamRelay};
pub use types::{Artifact, ChatMessage, ConversationTurn, EditContext, EditMode, RelayEvent, Role};
