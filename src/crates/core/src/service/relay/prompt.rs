use super::accumulator::ARTIFACT_TOOL_NAME;
use crate::infrastructure::ai::ToolDefinition;
use serde_json::json;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a friendly assistant that helps build small, \
self-contained HTML documents for a personal site. Talk with the user briefly in plain prose. \
When the user wants a document created or changed, call the write_document tool exactly once \
with the target path and the complete document body. Do not paste the document into your reply.";

pub fn artifact_tool() -> ToolDefinition {
    ToolDefinition {
        name: ARTIFACT_TOOL_NAME.to_string(),
        description: "Write a complete document to the site repository.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Repository path of the document, e.g. \"trips/lisbon/index.html\""
                },
                "body": {
                    "type": "string",
                    "description": "The full document source"
                }
            },
            "required": ["path", "body"]
        }),
    }
}
