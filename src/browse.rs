//! Read-side inspection of the mirrored tree.
//!
//! Backs `mirror tree`, `mirror show <path>` and `GET /content/{*path}`.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;
use crate::store::{find_by_path, Store};

/// Content of one node, addressed by path.
#[derive(Debug, Clone, Serialize)]
pub struct NodeContent {
    pub id: String,
    pub path: String,
    pub kind: &'static str,
    pub body: String,
}

/// Look up the content stored for `path`. `None` when the node or its
/// content record is missing.
///
/// Names are matched from the roots down and the first node persisted wins.
/// A directory stored as a root because its parent was never listed shadows
/// any later root with the same name.
pub async fn content_at(store: &dyn Store, path: &str) -> Result<Option<NodeContent>> {
    let node = match find_by_path(store, path).await? {
        Some(node) => node,
        None => return Ok(None),
    };
    let record = match store.get_content(&node.id).await? {
        Some(record) => record,
        None => return Ok(None),
    };
    Ok(Some(NodeContent {
        id: node.id,
        path: path.trim_matches('/').to_string(),
        kind: node.kind.as_str(),
        body: record.body,
    }))
}

/// Render the stored forest, one node per line, two spaces per level.
/// Directory names end in `/`.
pub async fn render_tree(store: &dyn Store) -> Result<String> {
    let mut out = String::new();
    // Depth-first with an explicit stack; children pushed in reverse keep
    // persistence order on output.
    let mut stack: Vec<(usize, crate::models::TreeNode)> =
        store.roots().await?.into_iter().rev().map(|n| (0, n)).collect();

    while let Some((depth, node)) = stack.pop() {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&node.name);
        if node.kind.is_directory() {
            out.push('/');
            let children = store.children(&node.id).await?;
            stack.extend(children.into_iter().rev().map(|c| (depth + 1, c)));
        }
        out.push('\n');
    }
    Ok(out)
}

/// `mirror tree`
pub async fn run_tree(config: &Config) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let rendered = render_tree(&store).await?;
    let nodes = store.count_nodes().await?;
    let contents = store.count_contents().await?;
    store.pool().close().await;

    if nodes == 0 {
        println!("(empty tree)");
        return Ok(());
    }
    print!("{}", rendered);
    println!();
    println!("{} nodes, {} content records", nodes, contents);
    Ok(())
}

/// `mirror show <path>`
pub async fn run_show(config: &Config, path: &str) -> Result<()> {
    let store = SqliteStore::new(db::connect(config).await?);
    let content = content_at(&store, path).await;
    store.pool().close().await;

    match content? {
        Some(content) => {
            println!("{}", content.body);
            Ok(())
        }
        None => bail!("no content for path: {}", path),
    }
}
