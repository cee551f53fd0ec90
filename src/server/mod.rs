//! HTTP proxy server
//!
//! An axum router over the provider and the chat pipeline. Every handler
//! answers JSON, errors included.

use crate::chat::ChatService;
use crate::config::Config;
use crate::github::{GitHubClient, SourceHost};
use crate::llm::{CompletionProvider, CompletionProviderFactory};
use crate::utils::http::{HttpClient, HttpClientBuilder};
use crate::Result;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub mod handlers;
pub mod response;

pub use response::{ApiError, ErrorBody};

/// State shared by all handlers
pub struct AppState {
    pub host: Arc<dyn SourceHost>,
    pub chat: ChatService,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        host: Arc<dyn SourceHost>,
        provider: Arc<dyn CompletionProvider>,
        config: &Config,
    ) -> Self {
        Self {
            chat: ChatService::new(host.clone(), provider, config),
            host,
        }
    }

    /// Wire the GitHub client and the configured completion provider
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpClient::new(
            HttpClientBuilder::new()
                .timeout(config.http.timeout())
                .build(),
        )?;
        let timeout_ms = http.config().timeout_ms();

        let host = GitHubClient::new(http.client().clone(), &config.github, &config.server, timeout_ms)?;
        let provider =
            CompletionProviderFactory::create_provider(&config.completion, http.client().clone(), timeout_ms)?;
        info!(provider = provider.provider_name(), model = %config.completion.model, "completion provider ready");

        Ok(Self::new(Arc::new(host), provider, config))
    }
}

/// All routes
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/auth/github", get(handlers::auth_redirect))
        .route("/api/auth/github/callback", get(handlers::auth_callback))
        .route("/api/repos", get(handlers::list_repositories))
        .route("/api/repos/:owner/:repo", get(handlers::repository))
        .route("/api/repos/:owner/:repo/files", get(handlers::repository_files))
        .route("/api/repos/:owner/:repo/tree", get(handlers::repository_tree))
        .route(
            "/api/repos/:owner/:repo/contents/*path",
            get(handlers::file_content),
        )
        .route("/api/chat", post(handlers::chat))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serve on an already bound listener until the process stops
pub async fn serve_on(listener: TcpListener, state: SharedState) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind the configured address and serve
pub async fn serve(config: &Config) -> Result<()> {
    for key in config.missing_credentials() {
        warn!("No value configured for '{}'", key);
    }

    let state = Arc::new(AppState::from_config(config)?);
    let bind = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind).await?;

    if config.server.production {
        info!("Running in production mode");
    }
    serve_on(listener, state).await
}
