//! Server-side chat pipeline
//!
//! [`ChatService::handle`] resolves the selected files, assembles the prompt
//! from repository context and session history, calls the completion
//! provider and formats the reply.

use crate::config::{Config, PartialFetchPolicy};
use crate::github::{self, FileContent, RepoData, SourceHost};
use crate::llm::{CompletionProvider, SamplingParams};
use crate::utils::errors::RepoChatError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

pub mod context;
pub mod format;
pub mod history;

pub use context::ContextAssembler;
pub use format::ResponseFormatter;
pub use history::{session_key, ConversationStore};

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub repo_data: Option<RepoData>,
    /// Paths fetched server-side when `files` is empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_paths: Vec<String>,
    /// Files with content supplied by the client
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_definitions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// Successful chat reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Chat pipeline shared by all requests
pub struct ChatService {
    host: Arc<dyn SourceHost>,
    provider: Arc<dyn CompletionProvider>,
    store: ConversationStore,
    assembler: ContextAssembler,
    formatter: ResponseFormatter,
    sampling: SamplingParams,
    partial_fetch: PartialFetchPolicy,
}

impl ChatService {
    pub fn new(
        host: Arc<dyn SourceHost>,
        provider: Arc<dyn CompletionProvider>,
        config: &Config,
    ) -> Self {
        Self {
            host,
            provider,
            store: ConversationStore::from_config(&config.chat),
            assembler: ContextAssembler::from_config(&config.chat),
            formatter: ResponseFormatter::from_config(&config.chat),
            sampling: config.completion.sampling(),
            partial_fetch: config.chat.partial_fetch,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// Answer one chat message
    pub async fn handle(&self, request: ChatRequest, token: Option<&str>) -> Result<ChatResponse> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(RepoChatError::validation("message", "Message must not be empty"));
        }

        let repo = request
            .repo_data
            .as_ref()
            .ok_or_else(|| RepoChatError::validation("repoData", "Please select a repository first."))?;

        let token = token
            .filter(|t| !t.is_empty())
            .or_else(|| repo.token.as_deref().filter(|t| !t.is_empty()));

        let files = self.resolve_files(&request, repo, token).await?;
        let session = session_key(request.session_id.as_deref(), token);
        let history = self.store.history(&session).await;

        let prompt = self
            .assembler
            .build(repo, &files, &request.code_definitions, &history, message);
        debug!(
            provider = self.provider.provider_name(),
            prompt_chars = prompt.len(),
            files = files.len(),
            history_lines = history.len(),
            "requesting completion"
        );

        let reply = self.provider.complete(&prompt, &self.sampling).await?;
        let formatted = self.formatter.format(&reply, &files);

        self.store.record_exchange(&session, message, &formatted).await;
        let sessions = self.store.session_count().await;
        info!(
            repository = %repo.repository.full_name,
            reply_chars = formatted.len(),
            sessions = sessions,
            "chat answered"
        );

        Ok(ChatResponse {
            response: formatted,
        })
    }

    /// Inline files win; otherwise fetch `file_paths` concurrently
    async fn resolve_files(
        &self,
        request: &ChatRequest,
        repo: &RepoData,
        token: Option<&str>,
    ) -> Result<Vec<FileContent>> {
        if !request.files.is_empty() {
            return Ok(request.files.clone());
        }
        if request.file_paths.is_empty() {
            return Ok(Vec::new());
        }

        let token = token.ok_or_else(|| RepoChatError::authentication("Missing token"))?;
        let (owner, name) = repo.repository.owner_and_name().ok_or_else(|| {
            RepoChatError::validation("repoData", "Repository owner could not be determined")
        })?;

        let fetches = github::fetch_file_contents(
            self.host.as_ref(),
            &owner,
            &name,
            &request.file_paths,
            token,
        )
        .await;
        github::apply_partial_policy(fetches, self.partial_fetch)
    }
}
