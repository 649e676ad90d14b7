//! HTTP trigger and read API tests.
//!
//! Each test binds the router to a free local port with an in-memory store
//! and a scripted remote, then drives it with `reqwest`.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{dir, file, FakeRemote};
use repo_mirror::config::{Config, DbConfig, LoggingConfig, RemoteConfig, ServerConfig};
use repo_mirror::remote::RemoteSource;
use repo_mirror::server;
use repo_mirror::store::memory::InMemoryStore;
use repo_mirror::store::Store;
use serde_json::Value;

const TOKEN: &str = "trigger-token";

fn test_config() -> Config {
    Config {
        db: DbConfig {
            path: PathBuf::from("unused.sqlite"),
        },
        remote: RemoteConfig {
            api_base: "http://127.0.0.1:9".to_string(),
            repo: "acme/handbook".to_string(),
            branch: "main".to_string(),
            token_env: None,
            timeout_secs: 5,
            fetch_concurrency: 2,
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        logging: LoggingConfig::default(),
    }
}

fn handbook_remote() -> FakeRemote {
    FakeRemote::new()
        .with_head("main", "t1")
        .with_listing(
            "t1",
            vec![
                dir("docs"),
                file("docs/README.md", "readme"),
                file("docs/setup.md", "setup"),
                dir("docs/assets"),
            ],
        )
        .with_blob("readme", "# Handbook\n")
        .with_blob("setup", "# Setup\n")
}

/// Start the server in the background and return its base URL.
async fn spawn_server(store: Arc<InMemoryStore>, remote: FakeRemote) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let config = test_config();
    let store: Arc<dyn Store> = store;
    let remote: Arc<dyn RemoteSource> = Arc::new(remote);
    tokio::spawn(async move {
        server::serve(listener, &config, store, remote).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn keyed_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.add_auth_key(TOKEN).await.unwrap();
    store
}

// ─── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_version() {
    let base = spawn_server(keyed_store().await, FakeRemote::new()).await;

    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn trigger_requires_bearer_token() {
    let store = keyed_store().await;
    let base = spawn_server(store.clone(), handbook_remote()).await;
    let client = reqwest::Client::new();
    let url = format!("{}/tree/full-update", base);

    let resp = client.post(&url).send().await.unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "unauthorized");

    let resp = client
        .post(&url)
        .header("Authorization", "Token trigger-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = client.post(&url).bearer_auth("wrong").send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "forbidden");

    // Rejected triggers never touch the store
    assert_eq!(store.count_nodes().await.unwrap(), 0);
}

#[tokio::test]
async fn trigger_rebuilds_tree_and_serves_content() {
    let store = keyed_store().await;
    let base = spawn_server(store.clone(), handbook_remote()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{}/tree/full-update", base))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["message"], "Tree updated successfully");
    assert_eq!(body["report"]["tree_id"], "t1");
    assert_eq!(body["report"]["directories"], 2);
    assert_eq!(body["report"]["files"], 2);
    assert_eq!(body["report"]["markdown_contents"], 2);
    assert_eq!(body["report"]["index_directories"], 1);
    assert_eq!(body["report"]["toc_directories"], 1);

    let resp = client
        .get(format!("{}/content/docs", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content: Value = resp.json().await.unwrap();
    assert_eq!(content["body"], "# Handbook\n");
    assert_eq!(content["kind"], "directory");

    let resp = client
        .get(format!("{}/content/docs/assets", base))
        .send()
        .await
        .unwrap();
    let content: Value = resp.json().await.unwrap();
    assert_eq!(content["body"], repo_mirror::toc::EMPTY_DIRECTORY);

    let resp = client
        .get(format!("{}/content/docs/missing.md", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn failures_report_their_stage() {
    // No head for the branch
    let base = spawn_server(keyed_store().await, FakeRemote::new()).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/tree/full-update", base))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "update_failed");
    assert_eq!(body["error"]["stage"], "commit_lookup");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to get latest commit"));

    // Head resolves but the listing is missing
    let remote = FakeRemote::new().with_head("main", "t404");
    let base = spawn_server(keyed_store().await, remote).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/tree/full-update", base))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["stage"], "tree_fetch");

    // Listing resolves but a markdown blob does not
    let remote = FakeRemote::new()
        .with_head("main", "t1")
        .with_listing("t1", vec![file("a.md", "gone")]);
    let base = spawn_server(keyed_store().await, remote).await;
    let resp = reqwest::Client::new()
        .post(format!("{}/tree/full-update", base))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["stage"], "processing");
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .starts_with("Failed to process tree"));
}

#[tokio::test]
async fn concurrent_triggers_are_serialized() {
    let store = keyed_store().await;
    let base = spawn_server(store.clone(), handbook_remote()).await;
    let client = reqwest::Client::new();
    let url = format!("{}/tree/full-update", base);

    let (a, b) = tokio::join!(
        client.post(&url).bearer_auth(TOKEN).send(),
        client.post(&url).bearer_auth(TOKEN).send(),
    );
    assert_eq!(a.unwrap().status(), 200);
    assert_eq!(b.unwrap().status(), 200);

    // Interleaved runs would leave duplicates behind
    assert_eq!(store.count_nodes().await.unwrap(), 4);
    assert_eq!(store.count_contents().await.unwrap(), 4);
}

#[tokio::test]
async fn started_update_survives_client_disconnect() {
    let mut entries = vec![dir("docs")];
    let mut remote = FakeRemote::new().with_head("main", "t1");
    for i in 0..10 {
        let blob = format!("page-{}", i);
        entries.push(file(&format!("docs/{}.md", blob), &blob));
        remote = remote.with_blob(&blob, &format!("# Page {}\n", i));
    }
    let remote = remote
        .with_listing("t1", entries)
        .with_fetch_delay(Duration::from_millis(200));

    let store = keyed_store().await;
    let base = spawn_server(store.clone(), remote).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();

    // Gives up long before the run can finish
    let result = client
        .post(format!("{}/tree/full-update", base))
        .bearer_auth(TOKEN)
        .send()
        .await;
    assert!(result.is_err());

    let deadline = Instant::now() + Duration::from_secs(5);
    while store.count_contents().await.unwrap() < 11 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(store.count_nodes().await.unwrap(), 11);
    assert_eq!(store.count_contents().await.unwrap(), 11);
}
