//! GitHubClient against a local mock of the GitHub REST API

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use repochat::config::{GithubConfig, ServerConfig};
use repochat::github::{self, EntryType, GitHubClient, SourceHost};
use repochat::utils::http::{HttpClient, HttpClientBuilder};
use repochat::RepoChatError;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Counters {
    main: AtomicUsize,
    master: AtomicUsize,
}

async fn tree(
    State(counters): State<Arc<Counters>>,
    Path((_owner, _repo, branch)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> impl IntoResponse {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("token gho_test") {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Bad credentials"})));
    }
    match branch.as_str() {
        "main" => {
            counters.main.fetch_add(1, Ordering::SeqCst);
            (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"})))
        }
        "master" => {
            counters.master.fetch_add(1, Ordering::SeqCst);
            (
                StatusCode::OK,
                Json(json!({
                    "sha": "abc",
                    "tree": [
                        {"path": "src", "type": "tree", "mode": "040000", "sha": "1"},
                        {"path": "src/lib.rs", "type": "blob", "mode": "100644", "sha": "2", "size": 12},
                        {"path": "vendor/dep", "type": "commit", "mode": "160000", "sha": "3"}
                    ],
                    "truncated": false
                })),
            )
        }
        _ => (StatusCode::NOT_FOUND, Json(json!({}))),
    }
}

async fn repository(Path((owner, repo)): Path<(String, String)>) -> Json<Value> {
    Json(json!({
        "name": repo,
        "full_name": format!("{}/{}", owner, repo),
        "description": "A test repository",
        "language": "Rust",
        "owner": {"login": owner},
        "open_issues_count": 1
    }))
}

async fn issues() -> Json<Value> {
    Json(json!([{"number": 3, "title": "Broken build", "state": "open"}]))
}

async fn contents(Path((_owner, _repo, path)): Path<(String, String, String)>) -> impl IntoResponse {
    match path.trim_start_matches('/') {
        // "fn main() {}\n" wrapped the way GitHub wraps base64
        "src/main.rs" => (
            StatusCode::OK,
            Json(json!({"content": "Zm4gbWFpbigp\nIHt9Cg==\n", "encoding": "base64"})),
        ),
        "src" => (StatusCode::OK, Json(json!([{"name": "main.rs"}]))),
        _ => (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))),
    }
}

async fn access_token(Json(body): Json<Value>) -> Json<Value> {
    if body["code"] == "good" && body["client_secret"] == "secret" {
        Json(json!({"access_token": "gho_new", "token_type": "bearer", "scope": "repo"}))
    } else {
        Json(json!({"error": "bad_verification_code", "error_description": "The code passed is incorrect or expired."}))
    }
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(Duration::from_secs(3)).await;
    Json(json!([]))
}

async fn start_mock(counters: Arc<Counters>) -> String {
    let app = Router::new()
        .route("/repos/:owner/:repo/git/trees/:branch", get(tree))
        .route("/repos/:owner/:repo", get(repository))
        .route("/repos/:owner/:repo/issues", get(issues))
        .route("/repos/:owner/:repo/contents/*path", get(contents))
        .route("/login/oauth/access_token", post(access_token))
        .route("/user/repos", get(slow))
        .with_state(counters);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

fn client_for(base: &str, timeout: Duration) -> GitHubClient {
    let github = GithubConfig {
        client_id: Some("id".to_string()),
        client_secret: Some("secret".to_string()),
        api_base_url: base.to_string(),
        oauth_base_url: base.to_string(),
        ..GithubConfig::default()
    };
    let http = HttpClient::new(HttpClientBuilder::new().timeout(timeout).build()).unwrap();
    GitHubClient::new(
        http.client().clone(),
        &github,
        &ServerConfig::default(),
        http.config().timeout_ms(),
    )
    .unwrap()
}

#[tokio::test]
async fn files_fall_back_from_main_to_master() {
    let counters = Arc::new(Counters::default());
    let base = start_mock(counters.clone()).await;
    let client = client_for(&base, Duration::from_secs(5));

    let files = github::fetch_repo_files(&client, "octo", "hello", "gho_test").await.unwrap();

    assert_eq!(counters.main.load(Ordering::SeqCst), 1);
    assert_eq!(counters.master.load(Ordering::SeqCst), 1);
    // Submodule entries are dropped
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].entry_type, EntryType::Tree);
    assert_eq!(files[1].path, "src/lib.rs");
    assert_eq!(files[1].size, Some(12));
}

#[tokio::test]
async fn bad_token_surfaces_authentication_error() {
    let counters = Arc::new(Counters::default());
    let base = start_mock(counters.clone()).await;
    let client = client_for(&base, Duration::from_secs(5));

    let err = github::fetch_repo_files(&client, "octo", "hello", "wrong").await.unwrap_err();
    assert!(matches!(err, RepoChatError::Authentication { .. }));
    assert_eq!(err.status_code(), 401);
}

#[tokio::test]
async fn repo_data_merges_metadata_and_issues() {
    let base = start_mock(Arc::new(Counters::default())).await;
    let client = client_for(&base, Duration::from_secs(5));

    let data = github::fetch_repo_data(&client, "octo", "hello", "gho_test").await.unwrap();
    assert_eq!(data.repository.full_name, "octo/hello");
    assert_eq!(data.repository.language.as_deref(), Some("Rust"));
    assert_eq!(data.repository.extra["open_issues_count"], 1);
    assert_eq!(data.issues[0]["title"], "Broken build");
}

#[tokio::test]
async fn file_content_is_decoded() {
    let base = start_mock(Arc::new(Counters::default())).await;
    let client = client_for(&base, Duration::from_secs(5));

    let content = client
        .get_file_content("octo", "hello", "src/main.rs", "gho_test")
        .await
        .unwrap();
    assert_eq!(content, "fn main() {}\n");

    let err = client.get_file_content("octo", "hello", "src", "gho_test").await.unwrap_err();
    assert!(matches!(err, RepoChatError::FileFetch { .. }));

    let err = client
        .get_file_content("octo", "hello", "nope.rs", "gho_test")
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
    assert_eq!(err.to_string(), "Not Found");
}

#[tokio::test]
async fn oauth_code_exchange() {
    let base = start_mock(Arc::new(Counters::default())).await;
    let client = client_for(&base, Duration::from_secs(5));

    assert_eq!(client.exchange_code("good").await.unwrap(), "gho_new");

    let err = client.exchange_code("stale").await.unwrap_err();
    assert_eq!(err.status_code(), 401);
    assert!(err.to_string().contains("incorrect or expired"));
}

#[tokio::test]
async fn slow_upstream_times_out() {
    let base = start_mock(Arc::new(Counters::default())).await;
    let client = client_for(&base, Duration::from_millis(200));

    let err = client.list_repositories("gho_test").await.unwrap_err();
    assert!(matches!(err, RepoChatError::Timeout { timeout_ms: 200 }));
    assert_eq!(err.status_code(), 504);
}
