//! Storage system
//!
//! Key-value persistence for credential records.

pub mod token_store;

pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
