//! GitHub REST client

use super::{EntryType, FileEntry, RepositoryInfo, SourceHost};
use crate::config::{GithubConfig, ServerConfig};
use crate::utils::errors::RepoChatError;
use crate::utils::http::HeaderBuilder;
use crate::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::HeaderMap;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const MSG_REPOSITORIES: &str = "Failed to fetch repositories";
const MSG_REPOSITORY: &str = "Failed to fetch repository data";
const MSG_FILES: &str = "Failed to fetch repository files";
const MSG_CONTENT: &str = "Failed to fetch file content";
const MSG_AUTH: &str = "Failed to authenticate with GitHub";

/// Path of the OAuth callback route, appended to the public URL
pub const CALLBACK_PATH: &str = "/api/auth/github/callback";

/// Client for the GitHub REST API and OAuth endpoints
pub struct GitHubClient {
    client: Client,
    api_base: Url,
    oauth_base: Url,
    client_id: String,
    client_secret: String,
    scope: String,
    redirect_uri: Option<String>,
    timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<RawTreeEntry>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct RawTreeEntry {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl GitHubClient {
    /// Create a client; credentials may be empty, OAuth calls then fail upstream
    pub fn new(
        client: Client,
        github: &GithubConfig,
        server: &ServerConfig,
        timeout_ms: u64,
    ) -> Result<Self> {
        Ok(Self {
            client,
            api_base: parse_base(&github.api_base_url)?,
            oauth_base: parse_base(&github.oauth_base_url)?,
            client_id: github.client_id.clone().unwrap_or_default(),
            client_secret: github.client_secret.clone().unwrap_or_default(),
            scope: github.scope.clone(),
            redirect_uri: server
                .public_url
                .as_deref()
                .map(|base| format!("{}{}", base.trim_end_matches('/'), CALLBACK_PATH)),
            timeout_ms,
        })
    }

    /// Build `{base}/{segments...}`, percent-encoding every segment
    fn url<'a, I>(base: &Url, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RepoChatError::server(format!("Cannot use '{}' as a base URL", base)))?
            .pop_if_empty()
            .extend(segments.into_iter().filter(|s| !s.is_empty()));
        Ok(url)
    }

    fn api_url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self::url(&self.api_base, segments)
    }

    fn auth_headers(token: &str) -> Result<HeaderMap> {
        Ok(HeaderBuilder::new()
            .github_accept()
            .github_token(token)
            .map_err(|_| RepoChatError::authentication("Token contains invalid characters"))?
            .build())
    }

    /// Send a request and decode its JSON body, mapping failures to `fallback`
    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        fallback: &str,
    ) -> Result<T> {
        let response = request
            .send()
            .await
            .map_err(|e| RepoChatError::from_transport(e, self.timeout_ms))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RepoChatError::from_transport(e, self.timeout_ms))?;

        if !status.is_success() {
            debug!(status = status.as_u16(), "GitHub request failed");
            return Err(RepoChatError::from_provider_response(
                status.as_u16(),
                &body,
                fallback,
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            RepoChatError::provider(502, format!("{}: unexpected response ({})", fallback, e))
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        token: &str,
        fallback: &str,
    ) -> Result<T> {
        debug!(%url, "GET");
        let request = self.client.get(url).headers(Self::auth_headers(token)?);
        self.send_json(request, fallback).await
    }
}

#[async_trait]
impl SourceHost for GitHubClient {
    fn authorize_url(&self) -> Result<String> {
        let mut url = Self::url(&self.oauth_base, ["login", "oauth", "authorize"])?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &self.client_id);
            query.append_pair("scope", &self.scope);
            if let Some(redirect) = &self.redirect_uri {
                query.append_pair("redirect_uri", redirect);
            }
        }
        Ok(url.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<String> {
        let url = Self::url(&self.oauth_base, ["login", "oauth", "access_token"])?;
        let request = self
            .client
            .post(url)
            .headers(HeaderBuilder::new().json_accept().json_content_type().build())
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            });

        let response: TokenResponse = self.send_json(request, MSG_AUTH).await?;
        match response.access_token {
            Some(token) if !token.is_empty() => Ok(token),
            _ => {
                let reason = response
                    .error_description
                    .or(response.error)
                    .unwrap_or_else(|| "no access token returned".to_string());
                Err(RepoChatError::authentication(format!("{}: {}", MSG_AUTH, reason)))
            }
        }
    }

    async fn list_repositories(&self, token: &str) -> Result<serde_json::Value> {
        let url = self.api_url(["user", "repos"])?;
        self.get_json(url, token, MSG_REPOSITORIES).await
    }

    async fn get_repository(&self, owner: &str, repo: &str, token: &str) -> Result<RepositoryInfo> {
        let url = self.api_url(["repos", owner, repo])?;
        self.get_json(url, token, MSG_REPOSITORY).await
    }

    async fn list_open_issues(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let mut url = self.api_url(["repos", owner, repo, "issues"])?;
        url.query_pairs_mut().append_pair("state", "open");
        self.get_json(url, token, MSG_REPOSITORY).await
    }

    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        token: &str,
    ) -> Result<Vec<FileEntry>> {
        let mut url = self.api_url(["repos", owner, repo, "git", "trees", branch])?;
        url.query_pairs_mut().append_pair("recursive", "1");
        let response: TreeResponse = self.get_json(url, token, MSG_FILES).await?;

        if response.truncated {
            debug!(owner, repo, branch, "GitHub truncated the recursive listing");
        }

        Ok(response
            .tree
            .into_iter()
            .filter_map(|entry| {
                let entry_type = EntryType::from_provider(&entry.kind)?;
                Some(FileEntry {
                    path: entry.path,
                    entry_type,
                    size: entry.size,
                })
            })
            .collect())
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        token: &str,
    ) -> Result<String> {
        let url = self.api_url(
            ["repos", owner, repo, "contents"]
                .into_iter()
                .chain(path.split('/')),
        )?;

        // A directory path answers with a JSON array
        let raw: serde_json::Value = self.get_json(url, token, MSG_CONTENT).await?;
        if raw.is_array() {
            return Err(RepoChatError::file_fetch(path, "path is a directory"));
        }
        let content: ContentResponse = serde_json::from_value(raw)?;
        decode_content(path, &content)
    }
}

fn parse_base(raw: &str) -> Result<Url> {
    Ok(Url::parse(raw.trim_end_matches('/'))?)
}

/// Decode the `content` field of a contents response.
///
/// GitHub wraps the base64 payload at 60 columns; line breaks are removed
/// before decoding.
fn decode_content(path: &str, response: &ContentResponse) -> Result<String> {
    match response.encoding.as_deref() {
        Some("base64") | None => {
            let compact: String = response
                .content
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();
            let bytes = STANDARD.decode(compact.as_bytes())?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        Some(other) => Err(RepoChatError::file_fetch(
            path,
            format!("unsupported content encoding '{}'", other),
        )),
    }
}
