use crate::infrastructure::ai::WireMessage;
use crate::util::errors::{AtelierError, AtelierResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    /// Targeted changes; everything else stays intact.
    Edit,
    /// A fresh document replacing the existing one.
    Rewrite,
}

/// The document the user is working on, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditContext {
    pub mode: EditMode,
    pub path: String,
    #[serde(default)]
    pub current_source: String,
}

impl EditContext {
    fn instructions(&self) -> String {
        let action = match self.mode {
            EditMode::Edit => {
                "Make the requested changes to the existing document and keep everything else intact."
            }
            EditMode::Rewrite => {
                "Write a new document for this path that replaces the existing one."
            }
        };
        format!(
            "[Editing `{}`]\n{}\nCall write_document with the same path and the complete updated body.\n\nCurrent source:\n```\n{}\n```\n\n",
            self.path, action, self.current_source
        )
    }
}

/// Prior exchanges plus one new user message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    pub message: String,
    #[serde(default)]
    pub edit: Option<EditContext>,
}

impl ConversationTurn {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            history: Vec::new(),
            message: message.into(),
            edit: None,
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_edit(mut self, edit: EditContext) -> Self {
        self.edit = Some(edit);
        self
    }

    /// Resolve the turn into the ordered message list sent upstream.
    pub fn to_messages(&self) -> AtelierResult<Vec<WireMessage>> {
        if self.message.trim().is_empty() {
            return Err(AtelierError::validation("message must not be empty"));
        }

        let mut messages: Vec<WireMessage> = self
            .history
            .iter()
            .filter(|m| !m.content.trim().is_empty())
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        let content = match &self.edit {
            Some(edit) => format!("{}{}", edit.instructions(), self.message),
            None => self.message.clone(),
        };
        messages.push(WireMessage {
            role: Role::User.as_str().to_string(),
            content,
        });

        Ok(messages)
    }
}

/// A complete document produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    #[serde(alias = "html")]
    pub body: String,
}

/// Events pushed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    Status { text: String },
    Text { text: String },
    Done {
        message: String,
        artifact: Option<Artifact>,
    },
    Error { message: String },
}

impl RelayEvent {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Text { .. } => "text",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done { .. } | Self::Error { .. })
    }

    /// The `data:` payload for the push stream.
    pub fn to_sse_data(&self) -> serde_json::Value {
        match self {
            Self::Status { text } | Self::Text { text } => serde_json::json!({ "text": text }),
            Self::Done { message, artifact } => {
                serde_json::json!({ "message": message, "artifact": artifact })
            }
            Self::Error { message } => serde_json::json!({ "message": message }),
        }
    }
}
