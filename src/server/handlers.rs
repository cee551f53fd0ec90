//! Route handlers

use super::response::ApiError;
use super::SharedState;
use crate::chat::{ChatRequest, ChatResponse};
use crate::github::{self, FileEntry, RepoData};
use crate::tree::{self, RenderedNode};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub struct TokenQuery {
    pub token: Option<String>,
}

impl TokenQuery {
    fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.trim().is_empty())
    }

    fn require(&self) -> ApiResult<&str> {
        self.token().ok_or_else(|| ApiError::unauthorized("Missing token"))
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentBody {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthBody {
    pub status: String,
    pub version: String,
}

/// 302 Found to `location`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub async fn auth_redirect(State(state): State<SharedState>) -> ApiResult<Response> {
    let url = state.host.authorize_url()?;
    Ok(found(&url))
}

pub async fn auth_callback(
    State(state): State<SharedState>,
    Query(query): Query<CallbackQuery>,
) -> ApiResult<Response> {
    let code = query
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing code"))?;

    let token = state.host.exchange_code(&code).await?;
    info!("OAuth code exchanged");

    let encoded: String = url::form_urlencoded::byte_serialize(token.as_bytes()).collect();
    Ok(found(&format!("/?token={}", encoded)))
}

pub async fn list_repositories(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let token = query.require()?;
    Ok(Json(state.host.list_repositories(token).await?))
}

pub async fn repository(
    State(state): State<SharedState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<RepoData>> {
    let token = query.require()?;
    let data = github::fetch_repo_data(state.host.as_ref(), &owner, &repo, token).await?;
    Ok(Json(data))
}

pub async fn repository_files(
    State(state): State<SharedState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Vec<FileEntry>>> {
    let token = query.require()?;
    let files = github::fetch_repo_files(state.host.as_ref(), &owner, &repo, token).await?;
    debug!(owner = %owner, repo = %repo, entries = files.len(), "listed files");
    Ok(Json(files))
}

pub async fn repository_tree(
    State(state): State<SharedState>,
    Path((owner, repo)): Path<(String, String)>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<Vec<RenderedNode>>> {
    let token = query.require()?;
    let files = github::fetch_repo_files(state.host.as_ref(), &owner, &repo, token).await?;
    Ok(Json(tree::render(&tree::build_tree(&files))))
}

pub async fn file_content(
    State(state): State<SharedState>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<TokenQuery>,
) -> ApiResult<Json<ContentBody>> {
    let token = query.require()?;
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Err(ApiError::bad_request("Missing file path"));
    }
    let content = state.host.get_file_content(&owner, &repo, path, token).await?;
    Ok(Json(ContentBody { content }))
}

pub async fn chat(
    State(state): State<SharedState>,
    Query(query): Query<TokenQuery>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> ApiResult<Json<ChatResponse>> {
    let Json(request) = payload.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    debug!(
        message_chars = request.message.len(),
        file_paths = request.file_paths.len(),
        inline_files = request.files.len(),
        "chat request"
    );

    state
        .chat
        .handle(request, query.token())
        .await
        .map(Json)
        .map_err(ApiError::chat)
}

pub async fn health() -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
    })
}
