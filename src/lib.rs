//! repochat - chat with an LLM about your GitHub repositories
//!
//! This library provides an HTTP proxy that composes the GitHub REST API
//! and a completion API: repository browsing, file tree rendering, prompt
//! assembly from repository context and reply formatting.

pub mod chat;
pub mod config;
pub mod github;
pub mod llm;
pub mod server;
pub mod session;
pub mod tree;
pub mod ui;
pub mod utils;

// Re-export commonly used types and traits
pub use chat::{ChatRequest, ChatResponse, ChatService};
pub use config::{Config, ConfigManager};
pub use github::{FileEntry, RepoData, SourceHost};
pub use llm::{CompletionProvider, CompletionProviderFactory, LlmError};
pub use session::{ChatBackend, ChatSession};
pub use utils::errors::{ConfigError, RepoChatError};

/// The main result type used throughout the application
pub type Result<T> = std::result::Result<T, RepoChatError>;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "repochat";
