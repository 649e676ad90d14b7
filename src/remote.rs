//! Remote repository source.
//!
//! The pipeline sees the remote host through the [`RemoteSource`] trait:
//! resolve a branch to a tree identifier, list a tree recursively, and fetch
//! a blob in its transport encoding. [`GitHubRemote`] implements it against
//! the GitHub REST API.
//!
//! # Endpoints
//!
//! | Call | GitHub endpoint |
//! |------|-----------------|
//! | [`resolve_tree_id`](RemoteSource::resolve_tree_id) | `GET /repos/{repo}/commits/{branch}` |
//! | [`list_tree`](RemoteSource::list_tree) | `GET /repos/{repo}/git/trees/{sha}?recursive=1` |
//! | [`fetch_blob`](RemoteSource::fetch_blob) | `GET /repos/{repo}/git/blobs/{sha}` |

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{PipelineError, Result};
use crate::models::{EntryKind, ListingEntry, TreeListing};

/// User-Agent string for API requests (GitHub rejects requests without one).
const USER_AGENT: &str = concat!("repo-mirror/", env!("CARGO_PKG_VERSION"));

/// A blob as delivered by the remote, still in its transport encoding.
#[derive(Debug, Clone)]
pub struct EncodedBlob {
    pub content: String,
    pub encoding: String,
}

/// The two opaque remote calls the pipeline depends on, plus the head
/// lookup used by the trigger.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolve a branch (or other commit reference) to its root tree id.
    async fn resolve_tree_id(&self, reference: &str) -> Result<String>;

    /// List a tree recursively. A truncated listing is returned as-is.
    async fn list_tree(&self, tree_id: &str) -> Result<TreeListing>;

    /// Fetch one blob by identifier.
    async fn fetch_blob(&self, blob_id: &str) -> Result<EncodedBlob>;
}

// ═══════════════════════════════════════════════════════════════════════
// GitHub
// ═══════════════════════════════════════════════════════════════════════

#[derive(Deserialize)]
struct CommitResponse {
    commit: CommitBody,
}

#[derive(Deserialize)]
struct CommitBody {
    tree: ShaRef,
}

#[derive(Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Deserialize)]
struct TreeResponse {
    sha: String,
    #[serde(default)]
    truncated: bool,
    tree: Vec<TreeItem>,
}

#[derive(Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    item_type: String,
    sha: String,
    #[serde(default)]
    size: Option<u64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default = "default_encoding")]
    encoding: String,
}

fn default_encoding() -> String {
    "base64".to_string()
}

/// [`RemoteSource`] backed by the GitHub REST API.
pub struct GitHubRemote {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    token: Option<String>,
}

impl GitHubRemote {
    pub fn new(config: &RemoteConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repo: config.repo.trim().to_string(),
            token: config.token(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.repo, path)
    }

    /// GET a JSON document, mapping transport, status and decode failures to
    /// a plain message for the caller to wrap.
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> std::result::Result<T, String> {
        debug!(url, "remote request");
        let mut request = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, truncate(&body, 200)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| format!("invalid response body: {}", e))
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[async_trait]
impl RemoteSource for GitHubRemote {
    async fn resolve_tree_id(&self, reference: &str) -> Result<String> {
        let url = self.url(&format!("commits/{}", reference));
        let commit: CommitResponse =
            self.get_json(&url)
                .await
                .map_err(|message| PipelineError::CommitLookup {
                    reference: reference.to_string(),
                    message,
                })?;
        Ok(commit.commit.tree.sha)
    }

    async fn list_tree(&self, tree_id: &str) -> Result<TreeListing> {
        let url = self.url(&format!("git/trees/{}?recursive=1", tree_id));
        let tree: TreeResponse =
            self.get_json(&url)
                .await
                .map_err(|message| PipelineError::ListingFetch {
                    tree_id: tree_id.to_string(),
                    message,
                })?;

        let entries = tree
            .tree
            .into_iter()
            .filter_map(|item| {
                // Submodules ("commit") have no content in this repository
                let kind = match item.item_type.as_str() {
                    "blob" => EntryKind::File,
                    "tree" => EntryKind::Directory,
                    _ => return None,
                };
                Some(ListingEntry {
                    path: item.path,
                    kind,
                    blob_id: item.sha,
                    size: item.size.unwrap_or(0),
                    url: item.url.unwrap_or_default(),
                })
            })
            .collect();

        Ok(TreeListing {
            tree_id: tree.sha,
            entries,
            truncated: tree.truncated,
        })
    }

    async fn fetch_blob(&self, blob_id: &str) -> Result<EncodedBlob> {
        let url = self.url(&format!("git/blobs/{}", blob_id));
        let blob: BlobResponse = self
            .get_json(&url)
            .await
            .map_err(|message| PipelineError::blob_fetch(blob_id, message))?;
        Ok(EncodedBlob {
            content: blob.content,
            encoding: blob.encoding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tree_response_maps_kinds() {
        let json = r#"{
            "sha": "t1",
            "url": "https://api.github.com/repos/a/b/git/trees/t1",
            "truncated": false,
            "tree": [
                {"path": "docs", "mode": "040000", "type": "tree", "sha": "d1", "url": "u1"},
                {"path": "docs/a.md", "mode": "100644", "type": "blob", "sha": "b1", "size": 12, "url": "u2"},
                {"path": "vendor/lib", "mode": "160000", "type": "commit", "sha": "c1"}
            ]
        }"#;
        let parsed: TreeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tree.len(), 3);
        assert_eq!(parsed.tree[1].size, Some(12));
        assert_eq!(parsed.tree[2].item_type, "commit");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
