//! Infrastructure layer
//!
//! Generation service client and credential storage.

pub mod ai;
pub mod storage;

pub use ai::{AnthropicClient, GenerationBackend};
pub use storage::{FileTokenStore, MemoryTokenStore, TokenStore};
