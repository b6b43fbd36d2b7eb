use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use atelier_core::service::repository::RepoFile;
use atelier_core::{resolve_target_path, Identity, RepositoryClient};
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap},
    Json,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ReadQuery {
    #[serde(default)]
    path: String,
    branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WriteRequest {
    pub path: String,
    pub body: String,
    pub sha: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct WriteResponse {
    pub path: String,
    pub sha: String,
}

fn repository(state: &AppState) -> ApiResult<&RepositoryClient> {
    state
        .repository
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("repository access is not configured"))
}

pub async fn read_file(
    State(state): State<AppState>,
    Query(query): Query<ReadQuery>,
) -> ApiResult<Json<RepoFile>> {
    let repo = repository(&state)?;
    let path = resolve_target_path(&query.path)?;
    match repo.read_file(&path, query.branch.as_deref()).await? {
        Some(file) => Ok(Json(file)),
        None => Err(ApiError::not_found(format!("{} does not exist", path))),
    }
}

/// Commit an artifact. The commit message names the requesting identity.
pub async fn write_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<WriteRequest>,
) -> ApiResult<Json<WriteResponse>> {
    let repo = repository(&state)?;
    let path = resolve_target_path(&request.path)?;
    let identity = Identity::from_headers(
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok()),
    );

    let verb = if request.sha.is_some() { "Update" } else { "Create" };
    let message = format!("{} {} (by {})", verb, path, identity.email);
    let sha = repo
        .write_file(&path, &request.body, &message, request.sha.as_deref())
        .await?;

    tracing::info!("Artifact committed: path={}, author={}", path, identity.email);
    Ok(Json(WriteResponse { path, sha }))
}
