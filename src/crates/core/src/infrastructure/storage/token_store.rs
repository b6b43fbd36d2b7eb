//! Token store boundary
//!
//! Plain get/put/delete over string keys of the form `<provider>:<accountId>`.
//! No transactions, no locking: concurrent writers race and the last write wins.

use crate::util::errors::AtelierResult;
use async_trait::async_trait;
use dashmap::DashMap;
use log::debug;
use std::path::PathBuf;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get(&self, key: &str) -> AtelierResult<Option<String>>;
    async fn put(&self, key: &str, value: String) -> AtelierResult<()>;
    /// Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> AtelierResult<()>;
}

/// Process-local store, used in tests and when no store directory is configured.
#[derive(Default)]
pub struct MemoryTokenStore {
    entries: DashMap<String, String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get(&self, key: &str) -> AtelierResult<Option<String>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> AtelierResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AtelierResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One JSON file per key inside a directory.
pub struct FileTokenStore {
    root: PathBuf,
}

impl FileTokenStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Percent-encoded so distinct keys never share a file.
    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self, key: &str) -> AtelierResult<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: String) -> AtelierResult<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(key);
        // Whole-file replace so readers never observe a partial record.
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("Token record written: key={}", key);
        Ok(())
    }

    async fn delete(&self, key: &str) -> AtelierResult<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
