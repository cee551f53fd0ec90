//! Simple console-based chat client for a running repochat server

use crate::chat::ChatRequest;
use crate::github::{EntryType, RepoData, RepositoryInfo};
use crate::server::ErrorBody;
use crate::session::{ChatBackend, ChatFailure, ChatSession, Message, Sender, SubmitOutcome};
use crate::tree::RenderedNode;
use crate::utils::errors::RepoChatError;
use crate::utils::http::HeaderBuilder;
use crate::Result;
use async_trait::async_trait;
use colored::*;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::io::{self, Write};
use tracing::debug;
use url::Url;

/// Talks to the server's JSON API
pub struct HttpChatBackend {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpChatBackend {
    pub fn new(client: Client, base_url: &str, token: Option<String>) -> Result<Self> {
        Ok(Self {
            client,
            base_url: Url::parse(base_url.trim_end_matches('/'))?,
            token,
        })
    }

    /// `{base}/{segments...}` with every segment percent-encoded
    fn url<'a, I>(&self, segments: I) -> Result<Url>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoChatError::server(format!("Cannot use '{}' as a server URL", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn token_query(&self) -> Vec<(&str, &str)> {
        self.token
            .as_deref()
            .map(|token| vec![("token", token)])
            .unwrap_or_default()
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .headers(HeaderBuilder::new().json_accept().build())
            .query(&self.token_query())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: Option<ErrorBody> = response.json().await.ok();
            let message = body
                .map(|b| b.error)
                .unwrap_or_else(|| format!("Request failed with status {}", status));
            return Err(RepoChatError::provider(status.as_u16(), message));
        }
        Ok(response.json().await?)
    }

    /// Repositories the token's user can access
    pub async fn repositories(&self) -> Result<Vec<RepositoryInfo>> {
        self.get_json(self.url(["api", "repos"])?).await
    }

    /// Metadata and issues for `owner/repo`, with the token attached
    pub async fn repository(&self, owner: &str, repo: &str) -> Result<RepoData> {
        let mut data: RepoData = self.get_json(self.url(["api", "repos", owner, repo])?).await?;
        data.token = self.token.clone();
        Ok(data)
    }

    /// Rendered file tree for `owner/repo`
    pub async fn tree(&self, owner: &str, repo: &str) -> Result<Vec<RenderedNode>> {
        self.get_json(self.url(["api", "repos", owner, repo, "tree"])?).await
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn send(&self, request: &ChatRequest) -> std::result::Result<String, ChatFailure> {
        let url = self
            .url(["api", "chat"])
            .map_err(|e| ChatFailure::new("Request failed", Some(e.to_string())))?;
        let response = self
            .client
            .post(url)
            .headers(HeaderBuilder::new().json_content_type().json_accept().build())
            .query(&self.token_query())
            .json(request)
            .send()
            .await
            .map_err(|e| ChatFailure::new("Request failed", Some(e.to_string())))?;

        let status = response.status();
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChatFailure::new("Invalid response from server", Some(e.to_string())))?;

        if status.is_success() {
            return body
                .get("response")
                .and_then(|r| r.as_str())
                .map(|r| r.to_string())
                .ok_or_else(|| ChatFailure::new("Invalid response from server", None));
        }

        debug!(status = status.as_u16(), "chat request failed");
        match serde_json::from_value::<ErrorBody>(body) {
            Ok(error) => Err(ChatFailure::new(error.error, error.details)),
            Err(_) => Err(ChatFailure::new(format!("Request failed with status {}", status), None)),
        }
    }
}

/// Interactive loop over a [`ChatSession`]
pub struct ConsoleChat {
    backend: HttpChatBackend,
    session: ChatSession,
    tree: Vec<RenderedNode>,
    last_printed: u64,
}

impl ConsoleChat {
    pub fn new(backend: HttpChatBackend, session: ChatSession) -> Self {
        Self {
            backend,
            session,
            tree: Vec::new(),
            last_printed: 0,
        }
    }

    pub async fn run(&mut self, initial_repo: Option<String>) -> Result<()> {
        self.print_banner();

        if let Some(repo) = initial_repo {
            self.select_repository(&repo).await;
        }

        loop {
            print!("{} ", "›".bright_blue().bold());
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            match input.split_once(' ').unwrap_or((input, "")) {
                ("exit" | "quit", _) => {
                    println!("{}", "Goodbye!".bright_yellow());
                    break;
                }
                ("help", _) => self.show_help(),
                ("clear", _) => {
                    print!("\x1B[2J\x1B[H");
                    io::stdout().flush()?;
                    self.print_banner();
                }
                ("/repos", _) => self.list_repositories().await,
                ("/repo", name) => self.select_repository(name.trim()).await,
                ("/tree", _) => self.show_tree(),
                ("/select", path) => {
                    self.toggle(path.trim(), true);
                }
                ("/unselect", path) => {
                    self.toggle(path.trim(), false);
                }
                ("/files", _) => self.show_selection(),
                _ => self.submit(input).await,
            }
        }

        Ok(())
    }

    async fn list_repositories(&self) {
        match self.backend.repositories().await {
            Ok(repos) if repos.is_empty() => println!("{}", "No repositories found".dimmed()),
            Ok(repos) => {
                for repo in repos {
                    match repo.description.as_deref().filter(|d| !d.is_empty()) {
                        Some(description) => {
                            println!("  {} {}", repo.full_name.bright_yellow(), description.dimmed())
                        }
                        None => println!("  {}", repo.full_name.bright_yellow()),
                    }
                }
            }
            Err(e) => println!("{}", format!("Error: {}", e).bright_red()),
        }
    }

    async fn select_repository(&mut self, full_name: &str) {
        let Some((owner, repo)) = full_name
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty())
        else {
            println!("{}", "Usage: /repo <owner>/<repo>".bright_red());
            return;
        };

        match self.backend.repository(owner, repo).await {
            Ok(data) => {
                self.session.select_repository(data);
                self.tree = match self.backend.tree(owner, repo).await {
                    Ok(tree) => tree,
                    Err(e) => {
                        println!("{}", format!("Could not load files: {}", e).bright_red());
                        Vec::new()
                    }
                };
                self.print_new_messages();
            }
            Err(e) => println!("{}", format!("Error: {}", e).bright_red()),
        }
    }

    async fn submit(&mut self, input: &str) {
        let pending = match self.session.begin(input) {
            Ok(pending) => pending,
            Err(SubmitOutcome::Ignored) => return,
            Err(_) => {
                self.print_new_messages();
                return;
            }
        };

        // The user line is already on screen
        self.last_printed = self
            .session
            .messages()
            .iter()
            .filter(|m| m.sender == Sender::User)
            .map(|m| m.id)
            .max()
            .unwrap_or(self.last_printed);

        println!("{}", crate::session::THINKING.dimmed());
        let result = self.backend.send(&pending.request).await;
        self.session.finish(pending, result);
        self.print_new_messages();
        println!();
    }

    /// Apply a selection change; only files from the loaded tree can be checked
    fn toggle(&mut self, path: &str, checked: bool) -> bool {
        if path.is_empty() {
            println!("{}", "Usage: /select <path> | /unselect <path>".bright_red());
            return false;
        }
        if checked && !self.tree.is_empty() {
            match self.tree.iter().find(|node| node.path == path) {
                Some(node) if node.node_type == EntryType::Blob => {}
                Some(_) => {
                    println!("{}", format!("{} is a directory", path).bright_red());
                    return false;
                }
                None => {
                    println!("{}", format!("No such file: {}", path).bright_red());
                    return false;
                }
            }
        }
        self.session.toggle_file(path, checked);
        self.show_selection();
        true
    }

    fn show_tree(&self) {
        if self.tree.is_empty() {
            println!("{}", "No files found".dimmed());
            return;
        }
        for node in &self.tree {
            let pad = " ".repeat(node.depth * 2);
            if node.node_type == EntryType::Tree {
                println!("{}{}/", pad, node.name.bright_cyan());
            } else {
                let mark = if self.session.selection().is_selected(&node.path) {
                    "[x]".bright_green()
                } else {
                    "[ ]".dimmed()
                };
                println!("{}{} {}", pad, mark, node.name);
            }
        }
    }

    fn show_selection(&self) {
        let paths = self.session.selection().paths();
        if paths.is_empty() {
            println!("{}", "No files selected".dimmed());
        } else {
            println!("{} {}", "Selected:".bright_cyan(), paths.join(", "));
        }
    }

    fn print_new_messages(&mut self) {
        let fresh: Vec<Message> = self
            .session
            .messages()
            .iter()
            .filter(|m| m.id > self.last_printed)
            .cloned()
            .collect();
        for message in fresh {
            Self::print_message(&message);
            self.last_printed = message.id;
        }
    }

    fn print_message(message: &Message) {
        let text = if message.is_error {
            message.text.bright_red()
        } else {
            match message.sender {
                Sender::User => message.text.normal(),
                Sender::Assistant => message.text.bright_cyan(),
            }
        };
        println!("{}", text);
    }

    fn print_banner(&self) {
        println!("{}", "repochat".bright_green().bold());
        println!(
            "{}",
            "Run /repos to list repositories and /repo <owner>/<repo> to pick one. 'help' lists commands.".dimmed()
        );
        println!();
    }

    fn show_help(&self) {
        println!();
        println!("{}", "Available commands:".bright_cyan().bold());
        println!("  {} - List your repositories", "/repos".bright_yellow());
        println!("  {} - Chat about a repository", "/repo <owner>/<repo>".bright_yellow());
        println!("  {} - Show the file tree", "/tree".bright_yellow());
        println!("  {} - Include a file in questions", "/select <path>".bright_yellow());
        println!("  {} - Stop including a file", "/unselect <path>".bright_yellow());
        println!("  {} - List selected files", "/files".bright_yellow());
        println!("  {} - Clear the screen", "clear".bright_yellow());
        println!("  {} - Exit", "exit/quit".bright_yellow());
        println!();
    }
}
