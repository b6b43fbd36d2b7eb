/// One classified unit of the upstream feed, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFragment {
    /// Narrative text to show the user.
    TextDelta(String),
    /// A reasoning block opened upstream.
    ThinkingStart,
    /// Reasoning content. Never forwarded.
    ThinkingDelta(String),
    /// A tool call opened; following input deltas belong to it.
    ToolStart { id: String, name: String },
    /// A partial-JSON chunk for the most recently started tool call.
    ToolInputDelta(String),
}
