//! Path decomposition.
//!
//! Splits a repository path into segments and works out which directory
//! nodes must exist before the path's own node can be created. All
//! deduplication goes through a [`RunContext`] that lives for exactly one
//! ingestion run.

use std::collections::HashMap;

use crate::error::{PipelineError, Result};
use crate::models::{EntryKind, NodeId};

/// Run-scoped path → node id mapping.
///
/// Created at the start of a full update and dropped at its end; it is
/// never shared between runs.
#[derive(Debug, Default)]
pub struct RunContext {
    paths: HashMap<String, NodeId>,
    /// Directories created in this run, in creation order.
    directories: Vec<(String, NodeId)>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, path: &str) -> Option<&NodeId> {
        self.paths.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains_key(path)
    }

    /// Record a freshly created node. Directories are also remembered for
    /// the content-resolution phase.
    pub fn record(&mut self, path: &str, id: &NodeId, is_directory: bool) {
        self.paths.insert(path.to_string(), id.clone());
        if is_directory {
            self.directories.push((path.to_string(), id.clone()));
        }
    }

    pub fn directories(&self) -> &[(String, NodeId)] {
        &self.directories
    }

    /// Number of distinct paths materialized so far.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// A node that needs to exist, keyed by its full path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRequest {
    pub path: String,
    pub name: String,
    /// Path of the parent node; `None` for roots. A parent path always
    /// refers to a node that is already in the context or that precedes
    /// this request in the same [`Decomposition`].
    pub parent_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decomposition {
    /// Missing ancestor directories, outermost first.
    pub ancestors: Vec<NodeRequest>,
    pub node: NodeRequest,
}

/// Split a path into its non-empty segments.
pub fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(PipelineError::InvalidPath(path.to_string()));
    }
    Ok(segments)
}

/// Decompose a listing path against what the run has already seen.
///
/// Files get every unseen ancestor directory synthesized and chained. A
/// directory from the listing is attached to its parent only if the parent
/// path is already known; otherwise it becomes a root, since listings are
/// not guaranteed to be depth-first.
pub fn decompose(ctx: &RunContext, path: &str, kind: EntryKind) -> Result<Decomposition> {
    let segments = split_path(path)?;
    let (last, dirs) = segments
        .split_last()
        .ok_or_else(|| PipelineError::InvalidPath(path.to_string()))?;
    let full_path = segments.join("/");

    match kind {
        EntryKind::File => {
            let mut ancestors = Vec::new();
            let mut parent_path: Option<String> = None;
            for (i, segment) in dirs.iter().enumerate() {
                let sub_path = segments[..=i].join("/");
                if !ctx.contains(&sub_path) {
                    ancestors.push(NodeRequest {
                        path: sub_path.clone(),
                        name: segment.to_string(),
                        parent_path: parent_path.clone(),
                    });
                }
                parent_path = Some(sub_path);
            }
            Ok(Decomposition {
                ancestors,
                node: NodeRequest {
                    path: full_path,
                    name: last.to_string(),
                    parent_path,
                },
            })
        }
        EntryKind::Directory => {
            let parent_path = if dirs.is_empty() {
                None
            } else {
                Some(dirs.join("/")).filter(|p| ctx.contains(p))
            };
            Ok(Decomposition {
                ancestors: Vec::new(),
                node: NodeRequest {
                    path: full_path,
                    name: last.to_string(),
                    parent_path,
                },
            })
        }
    }
}
