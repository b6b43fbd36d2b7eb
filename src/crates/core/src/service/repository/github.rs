//! Repository boundary over the GitHub contents API.

use crate::util::errors::{AtelierError, AtelierResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("atelier/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoFile {
    pub path: String,
    pub content: String,
    /// Version tag; pass it back to update instead of create.
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub api_base: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    content: WrittenContent,
}

#[derive(Debug, Deserialize)]
struct WrittenContent {
    sha: String,
}

#[derive(Clone)]
pub struct RepositoryClient {
    client: reqwest::Client,
    settings: RepositorySettings,
}

impl RepositoryClient {
    pub fn new(settings: RepositorySettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            settings,
        }
    }

    pub fn branch(&self) -> &str {
        &self.settings.branch
    }

    fn contents_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.settings.api_base.trim_end_matches('/'),
            self.settings.owner,
            self.settings.repo,
            encoded.join("/")
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.settings.token)
            .header("accept", "application/vnd.github+json")
            .header("user-agent", USER_AGENT)
    }

    /// Read `path` at `branch` (default branch when `None`). Missing files are `None`.
    pub async fn read_file(&self, path: &str, branch: Option<&str>) -> AtelierResult<Option<RepoFile>> {
        let branch = branch.unwrap_or(&self.settings.branch);
        let response = self
            .request(reqwest::Method::GET, self.contents_url(path))
            .query(&[("ref", branch)])
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let contents: ContentsResponse = response.error_for_status()?.json().await?;
        Ok(Some(decode_contents(contents)?))
    }

    /// Write `content` to `path`. With `sha` this updates that version; without it, creates.
    pub async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        sha: Option<&str>,
    ) -> AtelierResult<String> {
        let mut body = json!({
            "message": message,
            "content": STANDARD.encode(content.as_bytes()),
            "branch": self.settings.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = json!(sha);
        }

        let response = self
            .request(reqwest::Method::PUT, self.contents_url(path))
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if status == reqwest::StatusCode::CONFLICT
            || status == reqwest::StatusCode::UNPROCESSABLE_ENTITY
        {
            let detail = response.text().await.unwrap_or_default();
            return Err(AtelierError::provider(format!(
                "repository rejected write to {} ({}): {}",
                path, status, detail
            )));
        }
        let written: WriteResponse = response.error_for_status()?.json().await?;
        info!("Repository file written: path={}, created={}", path, sha.is_none());
        Ok(written.content.sha)
    }
}

fn decode_contents(contents: ContentsResponse) -> AtelierResult<RepoFile> {
    if contents.encoding != "base64" {
        return Err(AtelierError::provider(format!(
            "unsupported content encoding: {}",
            contents.encoding
        )));
    }
    // The API wraps base64 at 60 columns.
    let packed: String = contents.content.split_whitespace().collect();
    let bytes = STANDARD
        .decode(packed)
        .map_err(|e| AtelierError::provider(format!("invalid base64 content: {}", e)))?;
    debug!("Decoded repository file: path={}, bytes={}", contents.path, bytes.len());
    Ok(RepoFile {
        path: contents.path,
        content: String::from_utf8_lossy(&bytes).into_owned(),
        sha: contents.sha,
    })
}
