//! Generation service integration
//!
//! Wire types, the feed decoder and the HTTP client.

pub mod client;
pub mod stream_handler;
pub mod types;

pub use client::{
    AnthropicClient, ByteStream, GenerationBackend, GenerationRequest, ToolDefinition,
    WireMessage,
};
pub use stream_handler::handle_anthropic_stream;
pub use types::StreamFragment;
