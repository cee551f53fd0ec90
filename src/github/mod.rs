//! Source-hosting provider access
//!
//! [`SourceHost`] is the seam between the server and the provider REST API.
//! [`GitHubClient`] talks to GitHub; tests substitute in-memory hosts.
//! The aggregation helpers in [`aggregate`] compose host calls into the
//! records the UI consumes.

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod aggregate;
pub mod client;

pub use aggregate::{
    apply_partial_policy, fetch_file_contents, fetch_repo_data, fetch_repo_files, FileFetch,
};
pub use client::GitHubClient;

/// Kind of a listing entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// File
    Blob,
    /// Directory
    Tree,
}

impl EntryType {
    /// Parse the provider's type string; submodules (`commit`) and unknown kinds yield `None`
    pub fn from_provider(kind: &str) -> Option<Self> {
        match kind {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            _ => None,
        }
    }
}

/// One record of a flat repository listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntry {
    pub fn new<S: Into<String>>(path: S, entry_type: EntryType) -> Self {
        Self {
            path: path.into(),
            entry_type,
            size: None,
        }
    }

    pub fn blob<S: Into<String>>(path: S) -> Self {
        Self::new(path, EntryType::Blob)
    }

    pub fn tree<S: Into<String>>(path: S) -> Self {
        Self::new(path, EntryType::Tree)
    }
}

/// Repository owner as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryOwner {
    pub login: String,
}

/// Repository metadata.
///
/// Only the fields the server reads are typed; everything else the provider
/// returns is kept in `extra` and passed through to the UI untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub owner: Option<RepositoryOwner>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl RepositoryInfo {
    /// Minimal record, mostly useful in tests
    pub fn named<S: Into<String>>(owner: &str, name: S) -> Self {
        let name = name.into();
        Self {
            full_name: format!("{}/{}", owner, name),
            name,
            description: None,
            language: None,
            owner: Some(RepositoryOwner {
                login: owner.to_string(),
            }),
            extra: serde_json::Map::new(),
        }
    }

    /// `(owner, name)`, from the owner record or the `full_name`
    pub fn owner_and_name(&self) -> Option<(String, String)> {
        if let Some(owner) = &self.owner {
            return Some((owner.login.clone(), self.name.clone()));
        }
        self.full_name
            .split_once('/')
            .map(|(owner, name)| (owner.to_string(), name.to_string()))
    }
}

/// Repository metadata merged with its open issues
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoData {
    pub repository: RepositoryInfo,
    #[serde(default)]
    pub issues: Vec<serde_json::Value>,
    /// Token the UI attaches when echoing the record back in a chat request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A file path with its decoded text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    pub path: String,
    pub content: String,
}

impl FileContent {
    pub fn new<P: Into<String>, C: Into<String>>(path: P, content: C) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

/// Provider operations the server needs.
///
/// Every call that touches user data takes the user's OAuth token.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// URL the browser is sent to for OAuth authorization
    fn authorize_url(&self) -> Result<String>;

    /// Exchange an OAuth code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String>;

    /// Repositories of the authenticated user, passed through verbatim
    async fn list_repositories(&self, token: &str) -> Result<serde_json::Value>;

    /// Repository metadata
    async fn get_repository(&self, owner: &str, repo: &str, token: &str) -> Result<RepositoryInfo>;

    /// Open issues of a repository
    async fn list_open_issues(
        &self,
        owner: &str,
        repo: &str,
        token: &str,
    ) -> Result<Vec<serde_json::Value>>;

    /// Recursive listing of a branch
    async fn get_tree(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        token: &str,
    ) -> Result<Vec<FileEntry>>;

    /// Decoded text of one file
    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
        token: &str,
    ) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repository_info_passthrough() {
        let raw = json!({
            "name": "repochat",
            "full_name": "octo/repochat",
            "description": null,
            "language": "Rust",
            "owner": {"login": "octo", "id": 1},
            "stargazers_count": 42,
            "private": false
        });
        let info: RepositoryInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(info.description, None);
        assert_eq!(info.language.as_deref(), Some("Rust"));
        assert_eq!(info.extra["stargazers_count"], 42);

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["stargazers_count"], 42);
        assert_eq!(back["owner"]["login"], "octo");
    }

    #[test]
    fn test_owner_and_name_falls_back_to_full_name() {
        let raw = json!({"name": "x", "full_name": "someone/x"});
        let info: RepositoryInfo = serde_json::from_value(raw).unwrap();
        assert_eq!(
            info.owner_and_name(),
            Some(("someone".to_string(), "x".to_string()))
        );
    }

    #[test]
    fn test_file_entry_wire_format() {
        let entry: FileEntry = serde_json::from_value(json!({"path": "src/lib.rs", "type": "blob"})).unwrap();
        assert_eq!(entry, FileEntry::blob("src/lib.rs"));
        assert_eq!(
            serde_json::to_value(FileEntry::tree("src")).unwrap(),
            json!({"path": "src", "type": "tree"})
        );
    }

    #[test]
    fn test_entry_type_from_provider() {
        assert_eq!(EntryType::from_provider("blob"), Some(EntryType::Blob));
        assert_eq!(EntryType::from_provider("tree"), Some(EntryType::Tree));
        assert_eq!(EntryType::from_provider("commit"), None);
    }
}
