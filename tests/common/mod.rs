//! Shared fixtures: a scripted [`RemoteSource`] and store inspection helpers.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;

use repo_mirror::error::{PipelineError, Result};
use repo_mirror::models::{EntryKind, ListingEntry, TreeListing};
use repo_mirror::remote::{EncodedBlob, RemoteSource};
use repo_mirror::store::Store;

/// Remote with canned listings and blobs. Unknown blobs fail with HTTP 404.
#[derive(Default)]
pub struct FakeRemote {
    heads: HashMap<String, String>,
    listings: HashMap<String, TreeListing>,
    blobs: HashMap<String, EncodedBlob>,
    fetch_delay: Option<Duration>,
    pub blob_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(mut self, branch: &str, tree_id: &str) -> Self {
        self.heads.insert(branch.to_string(), tree_id.to_string());
        self
    }

    pub fn with_listing(mut self, tree_id: &str, entries: Vec<ListingEntry>) -> Self {
        self.listings.insert(
            tree_id.to_string(),
            TreeListing {
                tree_id: tree_id.to_string(),
                entries,
                truncated: false,
            },
        );
        self
    }

    pub fn truncated(mut self, tree_id: &str) -> Self {
        if let Some(listing) = self.listings.get_mut(tree_id) {
            listing.truncated = true;
        }
        self
    }

    /// Register a text blob, base64-encoded and wrapped at 60 columns the
    /// way GitHub delivers it.
    pub fn with_blob(mut self, blob_id: &str, text: &str) -> Self {
        let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
        let wrapped = encoded
            .as_bytes()
            .chunks(60)
            .map(|c| String::from_utf8_lossy(c).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.blobs.insert(
            blob_id.to_string(),
            EncodedBlob {
                content: format!("{}\n", wrapped),
                encoding: "base64".to_string(),
            },
        );
        self
    }

    pub fn with_raw_blob(mut self, blob_id: &str, content: &str, encoding: &str) -> Self {
        self.blobs.insert(
            blob_id.to_string(),
            EncodedBlob {
                content: content.to_string(),
                encoding: encoding.to_string(),
            },
        );
        self
    }

    /// Sleep this long in every blob fetch.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn blob_calls(&self) -> usize {
        self.blob_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn resolve_tree_id(&self, reference: &str) -> Result<String> {
        self.heads
            .get(reference)
            .cloned()
            .ok_or_else(|| PipelineError::CommitLookup {
                reference: reference.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }

    async fn list_tree(&self, tree_id: &str) -> Result<TreeListing> {
        self.listings
            .get(tree_id)
            .cloned()
            .ok_or_else(|| PipelineError::ListingFetch {
                tree_id: tree_id.to_string(),
                message: "HTTP 404 Not Found".to_string(),
            })
    }

    async fn fetch_blob(&self, blob_id: &str) -> Result<EncodedBlob> {
        self.blob_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
        self.blobs
            .get(blob_id)
            .cloned()
            .ok_or_else(|| PipelineError::blob_fetch(blob_id, "HTTP 404 Not Found"))
    }
}

pub fn file(path: &str, blob_id: &str) -> ListingEntry {
    ListingEntry {
        path: path.to_string(),
        kind: EntryKind::File,
        blob_id: blob_id.to_string(),
        size: 0,
        url: format!("https://api.example.test/blobs/{}", blob_id),
    }
}

pub fn dir(path: &str) -> ListingEntry {
    ListingEntry {
        path: path.to_string(),
        kind: EntryKind::Directory,
        blob_id: format!("tree-{}", path),
        size: 0,
        url: String::new(),
    }
}

/// One stored node, identified by path instead of id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shape {
    pub path: String,
    pub kind: &'static str,
    pub content_hash: String,
    pub body: Option<String>,
}

/// Depth-first view of the stored tree in persistence order, ids erased.
pub async fn shape(store: &dyn Store) -> Vec<Shape> {
    let mut out = Vec::new();
    let mut stack: Vec<(String, repo_mirror::models::TreeNode)> = store
        .roots()
        .await
        .unwrap()
        .into_iter()
        .rev()
        .map(|n| (n.name.clone(), n))
        .collect();

    while let Some((path, node)) = stack.pop() {
        let body = store.get_content(&node.id).await.unwrap().map(|c| c.body);
        if node.kind.is_directory() {
            let children = store.children(&node.id).await.unwrap();
            stack.extend(
                children
                    .into_iter()
                    .rev()
                    .map(|c| (format!("{}/{}", path, c.name), c)),
            );
        }
        out.push(Shape {
            path,
            kind: node.kind.as_str(),
            content_hash: node.kind.content_hash().to_string(),
            body,
        });
    }
    out
}

pub fn find<'a>(shape: &'a [Shape], path: &str) -> &'a Shape {
    shape
        .iter()
        .find(|s| s.path == path)
        .unwrap_or_else(|| panic!("no node at {}", path))
}
