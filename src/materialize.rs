//! Node materialization.
//!
//! Persists each distinct path of a run exactly once. A path already in the
//! [`RunContext`] returns its recorded id without touching the store.

use uuid::Uuid;

use crate::decompose::{Decomposition, NodeRequest, RunContext};
use crate::error::{PipelineError, Result};
use crate::models::{NodeId, NodeKind, TreeNode};
use crate::store::Store;

/// Outcome of a materialize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    pub id: NodeId,
    /// `false` when the path already existed in this run.
    pub created: bool,
}

/// Persist the node for `request` unless its path is already known.
pub async fn materialize(
    store: &dyn Store,
    ctx: &mut RunContext,
    request: &NodeRequest,
    kind: NodeKind,
) -> Result<Materialized> {
    if let Some(id) = ctx.lookup(&request.path) {
        return Ok(Materialized {
            id: id.clone(),
            created: false,
        });
    }

    let parent_id = match &request.parent_path {
        Some(parent_path) => Some(
            ctx.lookup(parent_path)
                .cloned()
                .ok_or_else(|| PipelineError::InvalidPath(request.path.clone()))?,
        ),
        None => None,
    };

    let node = TreeNode {
        id: Uuid::new_v4().to_string(),
        name: request.name.clone(),
        parent_id,
        kind,
    };
    store
        .insert_node(&node)
        .await
        .map_err(PipelineError::Persistence)?;

    ctx.record(&request.path, &node.id, node.kind.is_directory());
    Ok(Materialized {
        id: node.id,
        created: true,
    })
}

/// Materialize missing ancestors (as directories), then the node itself.
pub async fn materialize_decomposition(
    store: &dyn Store,
    ctx: &mut RunContext,
    decomposition: &Decomposition,
    kind: NodeKind,
) -> Result<Materialized> {
    for ancestor in &decomposition.ancestors {
        materialize(store, ctx, ancestor, NodeKind::Directory).await?;
    }
    materialize(store, ctx, &decomposition.node, kind).await
}
