//! Core data models used throughout the mirror.
//!
//! These types represent the remote tree listing as it arrives from the
//! source host, and the nodes and content records the pipeline persists.

use serde::Serialize;

/// Opaque node identifier (UUID v4 string).
pub type NodeId = String;

/// Kind of a listing entry as reported by the remote source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a recursive tree listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub path: String,
    pub kind: EntryKind,
    pub blob_id: String,
    pub size: u64,
    pub url: String,
}

/// Flat, recursively expanded listing of a repository snapshot.
#[derive(Debug, Clone, Default)]
pub struct TreeListing {
    pub tree_id: String,
    pub entries: Vec<ListingEntry>,
    /// The remote gave up before listing everything. Accepted as-is.
    pub truncated: bool,
}

/// Explicit node kind, fixed when the node is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    File {
        content_hash: String,
        source_url: String,
    },
    Directory,
}

impl NodeKind {
    pub fn is_directory(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Remote blob identifier; empty for directories.
    pub fn content_hash(&self) -> &str {
        match self {
            NodeKind::File { content_hash, .. } => content_hash,
            NodeKind::Directory => "",
        }
    }

    /// Remote URL of the blob; empty for directories.
    pub fn source_url(&self) -> &str {
        match self {
            NodeKind::File { source_url, .. } => source_url,
            NodeKind::Directory => "",
        }
    }

    /// Value stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File { .. } => "file",
            NodeKind::Directory => "directory",
        }
    }

    /// Rebuild a kind from its stored columns.
    pub fn from_columns(kind: &str, content_hash: String, source_url: String) -> Self {
        match kind {
            "directory" => NodeKind::Directory,
            _ => NodeKind::File {
                content_hash,
                source_url,
            },
        }
    }
}

/// A persisted file or directory. Write-once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub parent_id: Option<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

/// Resolved display content for one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentRecord {
    pub node_id: NodeId,
    pub body: String,
}

/// Markdown files get their content mirrored during materialization.
pub fn is_markdown(name: &str) -> bool {
    name.ends_with(".md")
}
