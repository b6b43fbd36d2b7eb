//! Per-turn accumulation of narrative text and tool-call input.

use super::types::{Artifact, RelayEvent};
use crate::infrastructure::ai::StreamFragment;
use log::{debug, warn};

pub const ARTIFACT_TOOL_NAME: &str = "write_document";
pub const BUILDING_STATUS: &str = "Building document...";
pub const THINKING_STATUS: &str = "Thinking...";

/// A tool call being assembled from partial-JSON chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolAccumulator {
    pub id: String,
    pub name: String,
    pub input: String,
}

/// The terminal result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub message: String,
    pub artifact: Option<Artifact>,
}

impl From<TurnOutcome> for RelayEvent {
    fn from(value: TurnOutcome) -> Self {
        RelayEvent::Done {
            message: value.message,
            artifact: value.artifact,
        }
    }
}

/// Folds fragments, in arrival order, into live events and a final outcome.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    /// Insertion-ordered; input deltas go to the last entry.
    tools: Vec<ToolAccumulator>,
    building: bool,
    thinking_announced: bool,
}

impl TurnAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tools(&self) -> &[ToolAccumulator] {
        &self.tools
    }

    /// Apply one fragment and return the event to forward, if any.
    pub fn apply(&mut self, fragment: StreamFragment) -> Option<RelayEvent> {
        match fragment {
            StreamFragment::TextDelta(delta) => {
                self.text.push_str(&delta);
                // Prose after the artifact starts is not user-facing narrative.
                if self.building || delta.is_empty() {
                    None
                } else {
                    Some(RelayEvent::text(delta))
                }
            }
            StreamFragment::ThinkingStart => {
                if self.thinking_announced || self.building {
                    return None;
                }
                self.thinking_announced = true;
                Some(RelayEvent::status(THINKING_STATUS))
            }
            StreamFragment::ThinkingDelta(_) => None,
            StreamFragment::ToolStart { id, name } => {
                debug!("Tool call started: id={}, name={}", id, name);
                let is_artifact = name == ARTIFACT_TOOL_NAME;
                self.tools.push(ToolAccumulator {
                    id,
                    name,
                    input: String::new(),
                });
                if is_artifact && !self.building {
                    self.building = true;
                    Some(RelayEvent::status(BUILDING_STATUS))
                } else {
                    None
                }
            }
            StreamFragment::ToolInputDelta(partial) => {
                match self.tools.last_mut() {
                    Some(tool) => tool.input.push_str(&partial),
                    None => warn!("Dropping tool input delta with no open tool call"),
                }
                None
            }
        }
    }

    /// The artifact from the last artifact tool call whose input parses.
    fn artifact(&self) -> Option<Artifact> {
        self.tools
            .iter()
            .rev()
            .filter(|tool| tool.name == ARTIFACT_TOOL_NAME)
            .find_map(|tool| match serde_json::from_str::<Artifact>(&tool.input) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    warn!(
                        "Discarding unparseable artifact input: id={}, len={}, error={}",
                        tool.id,
                        tool.input.len(),
                        e
                    );
                    None
                }
            })
    }

    pub fn finish(self) -> TurnOutcome {
        let artifact = self.artifact();
        let mut message = self.text.trim().to_string();
        if message.is_empty() {
            if let Some(artifact) = &artifact {
                message = default_acknowledgement(&artifact.path);
            }
        }
        TurnOutcome { message, artifact }
    }
}

pub fn default_acknowledgement(path: &str) -> String {
    format!("I've built the document at {}.", path)
}
