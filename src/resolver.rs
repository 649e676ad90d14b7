//! Directory content resolution.
//!
//! A directory mirrors its `README.md` (or, failing that, its `index.md`)
//! verbatim. Directories without either get a generated table of contents.

use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::fetcher::fetch_content;
use crate::models::TreeNode;
use crate::remote::RemoteSource;
use crate::store::Store;
use crate::toc::generate_toc;

/// Index file names, in precedence order.
pub const INDEX_FILES: [&str; 2] = ["README.md", "index.md"];

/// Where a directory's content came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySource {
    /// Mirrored from the named child file.
    IndexFile(String),
    /// Generated table of contents.
    Toc,
}

/// First index file among the directory's immediate children.
pub async fn find_index_file(store: &dyn Store, node_id: &str) -> Result<Option<TreeNode>> {
    for name in INDEX_FILES {
        let child = store
            .find_child(Some(node_id), name)
            .await
            .map_err(PipelineError::Persistence)?;
        if let Some(child) = child.filter(|c| !c.kind.is_directory()) {
            return Ok(Some(child));
        }
    }
    Ok(None)
}

/// Resolve and store the display content of one directory.
pub async fn resolve_directory(
    store: &dyn Store,
    remote: &dyn RemoteSource,
    node_id: &str,
    path: &str,
) -> Result<DirectorySource> {
    let (body, source) = match find_index_file(store, node_id).await? {
        Some(index) => {
            let body = fetch_content(remote, index.kind.content_hash()).await?;
            (body, DirectorySource::IndexFile(index.name))
        }
        None => (generate_toc(store, node_id).await?, DirectorySource::Toc),
    };

    store
        .upsert_content(node_id, &body)
        .await
        .map_err(PipelineError::Persistence)?;

    debug!(path, source = ?source, "directory content resolved");
    Ok(source)
}
