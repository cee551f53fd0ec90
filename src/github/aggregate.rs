//! Composite provider fetches
//!
//! Each helper fans out to several [`SourceHost`] calls concurrently and
//! merges the results into one record.

use super::{FileContent, FileEntry, RepoData, SourceHost};
use crate::config::PartialFetchPolicy;
use crate::utils::errors::RepoChatError;
use crate::utils::http::try_with_fallback;
use crate::Result;
use futures::future::join_all;
use tracing::{debug, warn};

/// Branch tried first for listings
pub const PRIMARY_BRANCH: &str = "main";
/// Branch tried once when the primary listing fails
pub const FALLBACK_BRANCH: &str = "master";

/// Outcome of fetching one selected file
#[derive(Debug)]
pub struct FileFetch {
    pub path: String,
    pub result: Result<String>,
}

/// Repository metadata and open issues, fetched concurrently.
///
/// Fails if either call fails.
pub async fn fetch_repo_data(
    host: &dyn SourceHost,
    owner: &str,
    repo: &str,
    token: &str,
) -> Result<RepoData> {
    let (repository, issues) = futures::try_join!(
        host.get_repository(owner, repo, token),
        host.list_open_issues(owner, repo, token)
    )?;

    debug!(owner, repo, issues = issues.len(), "fetched repository data");
    Ok(RepoData {
        repository,
        issues,
        token: None,
    })
}

/// Flat listing of the default branch, trying `main` then `master` once
pub async fn fetch_repo_files(
    host: &dyn SourceHost,
    owner: &str,
    repo: &str,
    token: &str,
) -> Result<Vec<FileEntry>> {
    try_with_fallback(PRIMARY_BRANCH, FALLBACK_BRANCH, |branch| {
        host.get_tree(owner, repo, branch, token)
    })
    .await
}

/// Fetch every path concurrently; results come back in input order
pub async fn fetch_file_contents(
    host: &dyn SourceHost,
    owner: &str,
    repo: &str,
    paths: &[String],
    token: &str,
) -> Vec<FileFetch> {
    let fetches = paths.iter().map(|path| async move {
        FileFetch {
            path: path.clone(),
            result: host.get_file_content(owner, repo, path, token).await,
        }
    });
    join_all(fetches).await
}

/// Resolve per-file outcomes under `policy`.
///
/// `FailAll` surfaces the first failure in input order; `SkipFailed` logs
/// and drops failures.
pub fn apply_partial_policy(
    fetches: Vec<FileFetch>,
    policy: PartialFetchPolicy,
) -> Result<Vec<FileContent>> {
    let mut files = Vec::with_capacity(fetches.len());
    for fetch in fetches {
        match fetch.result {
            Ok(content) => files.push(FileContent::new(fetch.path, content)),
            Err(e) => match policy {
                PartialFetchPolicy::FailAll => {
                    return Err(RepoChatError::file_fetch(fetch.path, e.to_string()));
                }
                PartialFetchPolicy::SkipFailed => {
                    warn!(path = %fetch.path, error = %e, "skipping file that could not be fetched");
                }
            },
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::RepositoryInfo;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory host recording every call
    #[derive(Default)]
    struct FakeHost {
        trees: HashMap<String, Vec<FileEntry>>,
        files: HashMap<String, String>,
        fail_issues: bool,
        calls: Mutex<Vec<String>>,
    }

    impl FakeHost {
        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SourceHost for FakeHost {
        fn authorize_url(&self) -> Result<String> {
            Ok("https://example.test/authorize".to_string())
        }

        async fn exchange_code(&self, code: &str) -> Result<String> {
            Ok(format!("token-for-{}", code))
        }

        async fn list_repositories(&self, _token: &str) -> Result<serde_json::Value> {
            Ok(serde_json::json!([]))
        }

        async fn get_repository(&self, owner: &str, repo: &str, _token: &str) -> Result<RepositoryInfo> {
            self.record(format!("repo {}/{}", owner, repo));
            Ok(RepositoryInfo::named(owner, repo))
        }

        async fn list_open_issues(
            &self,
            owner: &str,
            repo: &str,
            _token: &str,
        ) -> Result<Vec<serde_json::Value>> {
            self.record(format!("issues {}/{}", owner, repo));
            if self.fail_issues {
                return Err(RepoChatError::provider(500, "Failed to fetch repository data"));
            }
            Ok(vec![serde_json::json!({"number": 1, "title": "Bug"})])
        }

        async fn get_tree(
            &self,
            _owner: &str,
            _repo: &str,
            branch: &str,
            _token: &str,
        ) -> Result<Vec<FileEntry>> {
            self.record(format!("tree {}", branch));
            self.trees
                .get(branch)
                .cloned()
                .ok_or_else(|| RepoChatError::provider(404, "Not Found"))
        }

        async fn get_file_content(
            &self,
            _owner: &str,
            _repo: &str,
            path: &str,
            _token: &str,
        ) -> Result<String> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| RepoChatError::provider(404, "Not Found"))
        }
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_repo_data_merges_issues() {
        let host = FakeHost::default();
        let data = fetch_repo_data(&host, "octo", "hello", "t").await.unwrap();
        assert_eq!(data.repository.name, "hello");
        assert_eq!(data.issues.len(), 1);
        assert_eq!(data.issues[0]["title"], "Bug");
    }

    #[tokio::test]
    async fn test_repo_data_fails_when_issues_fail() {
        let host = FakeHost {
            fail_issues: true,
            ..FakeHost::default()
        };
        let err = fetch_repo_data(&host, "octo", "hello", "t").await.unwrap_err();
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn test_files_use_main_when_present() {
        let mut host = FakeHost::default();
        host.trees.insert("main".into(), vec![FileEntry::blob("README.md")]);
        host.trees.insert("master".into(), vec![FileEntry::blob("OLD.md")]);

        let files = fetch_repo_files(&host, "octo", "hello", "t").await.unwrap();
        assert_eq!(files, vec![FileEntry::blob("README.md")]);
        assert_eq!(host.calls(), vec!["tree main"]);
    }

    #[tokio::test]
    async fn test_files_fall_back_to_master_once() {
        let mut host = FakeHost::default();
        host.trees.insert("master".into(), vec![FileEntry::blob("legacy.c")]);

        let files = fetch_repo_files(&host, "octo", "hello", "t").await.unwrap();
        assert_eq!(files, vec![FileEntry::blob("legacy.c")]);
        assert_eq!(host.calls(), vec!["tree main", "tree master"]);
    }

    #[tokio::test]
    async fn test_files_fail_after_both_branches() {
        let host = FakeHost::default();
        let err = fetch_repo_files(&host, "octo", "hello", "t").await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(host.calls(), vec!["tree main", "tree master"]);
    }

    #[tokio::test]
    async fn test_file_contents_keep_input_order() {
        let mut host = FakeHost::default();
        host.files.insert("a.rs".into(), "A".into());
        host.files.insert("c.rs".into(), "C".into());

        let fetches =
            fetch_file_contents(&host, "octo", "hello", &paths(&["c.rs", "b.rs", "a.rs"]), "t").await;
        let order: Vec<&str> = fetches.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(order, vec!["c.rs", "b.rs", "a.rs"]);
        assert!(fetches[1].result.is_err());
    }

    #[tokio::test]
    async fn test_fail_all_policy_names_failed_file() {
        let mut host = FakeHost::default();
        host.files.insert("a.rs".into(), "A".into());
        host.files.insert("c.rs".into(), "C".into());

        let fetches =
            fetch_file_contents(&host, "octo", "hello", &paths(&["a.rs", "b.rs", "c.rs"]), "t").await;
        let err = apply_partial_policy(fetches, PartialFetchPolicy::FailAll).unwrap_err();
        match err {
            RepoChatError::FileFetch { path, .. } => assert_eq!(path, "b.rs"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_skip_failed_policy_keeps_rest() {
        let mut host = FakeHost::default();
        host.files.insert("a.rs".into(), "A".into());
        host.files.insert("c.rs".into(), "C".into());

        let fetches =
            fetch_file_contents(&host, "octo", "hello", &paths(&["a.rs", "b.rs", "c.rs"]), "t").await;
        let files = apply_partial_policy(fetches, PartialFetchPolicy::SkipFailed).unwrap();
        assert_eq!(
            files,
            vec![FileContent::new("a.rs", "A"), FileContent::new("c.rs", "C")]
        );
    }
}
