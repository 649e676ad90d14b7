//! In-memory [`Store`] implementation for tests and dry runs.
//!
//! Uses `Vec` and `HashMap` behind `std::sync::RwLock`. Node order in the
//! vector is insertion order, which matches SQLite `rowid` order. Id checks
//! on insert go through a `HashSet` index, never a scan.

use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::models::{ContentRecord, NodeId, TreeNode};

use super::Store;

/// In-memory store.
pub struct InMemoryStore {
    nodes: RwLock<NodeTable>,
    contents: RwLock<HashMap<String, String>>,
    keys: RwLock<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(NodeTable::default()),
            contents: RwLock::new(HashMap::new()),
            keys: RwLock::new(Vec::new()),
        }
    }

    /// Every stored node in insertion order.
    pub fn snapshot(&self) -> Result<Vec<TreeNode>> {
        Ok(read(&self.nodes)?.nodes.clone())
    }
}

/// Nodes in insertion order plus an id index.
#[derive(Default)]
struct NodeTable {
    nodes: Vec<TreeNode>,
    ids: HashSet<NodeId>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| anyhow!("in-memory store lock poisoned"))
}

#[async_trait]
impl Store for InMemoryStore {
    async fn wipe_tree(&self) -> Result<()> {
        write(&self.contents)?.clear();
        let mut table = write(&self.nodes)?;
        table.nodes.clear();
        table.ids.clear();
        Ok(())
    }

    async fn insert_node(&self, node: &TreeNode) -> Result<()> {
        let mut table = write(&self.nodes)?;
        if table.ids.contains(&node.id) {
            bail!("node {} already exists", node.id);
        }
        if let Some(parent) = &node.parent_id {
            if !table.ids.contains(parent) {
                bail!("parent {} of node {} does not exist", parent, node.id);
            }
        }
        table.ids.insert(node.id.clone());
        table.nodes.push(node.clone());
        Ok(())
    }

    async fn children(&self, parent_id: &str) -> Result<Vec<TreeNode>> {
        Ok(read(&self.nodes)?
            .nodes
            .iter()
            .filter(|n| n.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn roots(&self) -> Result<Vec<TreeNode>> {
        Ok(read(&self.nodes)?
            .nodes
            .iter()
            .filter(|n| n.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn find_child(&self, parent_id: Option<&str>, name: &str) -> Result<Option<TreeNode>> {
        Ok(read(&self.nodes)?
            .nodes
            .iter()
            .find(|n| n.parent_id.as_deref() == parent_id && n.name == name)
            .cloned())
    }

    async fn count_nodes(&self) -> Result<usize> {
        Ok(read(&self.nodes)?.nodes.len())
    }

    async fn upsert_content(&self, node_id: &str, body: &str) -> Result<()> {
        if !read(&self.nodes)?.ids.contains(node_id) {
            bail!("cannot store content for unknown node {}", node_id);
        }
        write(&self.contents)?.insert(node_id.to_string(), body.to_string());
        Ok(())
    }

    async fn get_content(&self, node_id: &str) -> Result<Option<ContentRecord>> {
        Ok(read(&self.contents)?
            .get(node_id)
            .map(|body| ContentRecord {
                node_id: node_id.to_string(),
                body: body.clone(),
            }))
    }

    async fn count_contents(&self) -> Result<usize> {
        Ok(read(&self.contents)?.len())
    }

    async fn has_auth_key(&self, token: &str) -> Result<bool> {
        Ok(read(&self.keys)?.iter().any(|k| k == token))
    }

    async fn add_auth_key(&self, token: &str) -> Result<()> {
        let mut keys = write(&self.keys)?;
        if !keys.iter().any(|k| k == token) {
            keys.push(token.to_string());
        }
        Ok(())
    }

    async fn revoke_auth_key(&self, token: &str) -> Result<bool> {
        let mut keys = write(&self.keys)?;
        let before = keys.len();
        keys.retain(|k| k != token);
        Ok(keys.len() != before)
    }
}
