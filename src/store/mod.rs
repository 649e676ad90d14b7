//! Storage abstraction for the mirror.
//!
//! The [`Store`] trait defines every storage operation the pipeline, the
//! HTTP server and the CLI need, so the pipeline can run against SQLite in
//! production and against [`memory::InMemoryStore`] in tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ContentRecord, TreeNode};

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`wipe_tree`](Store::wipe_tree) | Delete every node and content record |
/// | [`insert_node`](Store::insert_node) | Persist a new node |
/// | [`children`](Store::children) | Immediate children, in persistence order |
/// | [`roots`](Store::roots) | Parentless nodes, in persistence order |
/// | [`find_child`](Store::find_child) | Child (or root) with an exact name |
/// | [`upsert_content`](Store::upsert_content) | Create or replace a node's content |
/// | [`get_content`](Store::get_content) | Content record for a node |
/// | [`has_auth_key`](Store::has_auth_key) | Check a trigger bearer token |
#[async_trait]
pub trait Store: Send + Sync {
    /// Delete all tree nodes and, with them, all content records.
    async fn wipe_tree(&self) -> Result<()>;

    /// Persist a new node. Nodes are never updated afterwards.
    async fn insert_node(&self, node: &TreeNode) -> Result<()>;

    /// Immediate children of `parent_id`, in the order they were inserted.
    async fn children(&self, parent_id: &str) -> Result<Vec<TreeNode>>;

    /// Nodes without a parent, in the order they were inserted.
    async fn roots(&self) -> Result<Vec<TreeNode>>;

    /// First child of `parent_id` (or first root when `None`) named `name`.
    async fn find_child(&self, parent_id: Option<&str>, name: &str) -> Result<Option<TreeNode>>;

    /// Total number of stored nodes.
    async fn count_nodes(&self) -> Result<usize>;

    /// Insert the node's content record, or update it in place.
    async fn upsert_content(&self, node_id: &str, body: &str) -> Result<()>;

    async fn get_content(&self, node_id: &str) -> Result<Option<ContentRecord>>;

    /// Total number of stored content records.
    async fn count_contents(&self) -> Result<usize>;

    /// Whether `token` is a registered trigger key.
    async fn has_auth_key(&self, token: &str) -> Result<bool>;

    /// Register a trigger key. Registering an existing key is a no-op.
    async fn add_auth_key(&self, token: &str) -> Result<()>;

    /// Remove a trigger key; returns whether it existed.
    async fn revoke_auth_key(&self, token: &str) -> Result<bool>;
}

/// Resolve a `/`-separated repository path to its node by walking names
/// down from the roots. Sibling name collisions resolve to the node
/// persisted first.
pub async fn find_by_path(store: &dyn Store, path: &str) -> Result<Option<TreeNode>> {
    let mut current: Option<TreeNode> = None;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let parent = current.as_ref().map(|n| n.id.as_str());
        match store.find_child(parent, segment).await? {
            Some(node) => current = Some(node),
            None => return Ok(None),
        }
    }
    Ok(current)
}
