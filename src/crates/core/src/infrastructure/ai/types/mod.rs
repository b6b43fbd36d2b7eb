pub mod anthropic;
pub mod fragment;

pub use fragment::StreamFragment;
