//! Repository boundary

pub mod github;
pub mod path;

pub use github::{RepoFile, RepositoryClient, RepositorySettings, DEFAULT_GITHUB_API_BASE};
pub use path::resolve_target_path;
