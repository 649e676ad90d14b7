//! Table-of-contents generation for directories without authored content.

use crate::error::{PipelineError, Result};
use crate::models::TreeNode;
use crate::store::Store;

/// Document used for a directory with no children.
pub const EMPTY_DIRECTORY: &str =
    "# Empty Directory\n\nThis directory doesn't contain any files or subdirectories.";

/// Build the TOC for `node_id` from its immediate children.
pub async fn generate_toc(store: &dyn Store, node_id: &str) -> Result<String> {
    let children = store
        .children(node_id)
        .await
        .map_err(PipelineError::Persistence)?;
    Ok(render_toc(&children))
}

/// Render a TOC from children in persistence order.
///
/// Directories link to `name/`. Files link to `name`; markdown files are
/// labelled without their `.md` suffix.
pub fn render_toc(children: &[TreeNode]) -> String {
    let (directories, files): (Vec<&TreeNode>, Vec<&TreeNode>) =
        children.iter().partition(|c| c.kind.is_directory());

    if directories.is_empty() && files.is_empty() {
        return EMPTY_DIRECTORY.to_string();
    }

    let mut toc = String::from("# Table of Contents\n\n");

    if !directories.is_empty() {
        toc.push_str("## 📁 Directories\n\n");
        for dir in &directories {
            toc.push_str(&format!("- [{0}/]({0}/)\n", dir.name));
        }
        toc.push('\n');
    }

    if !files.is_empty() {
        toc.push_str("## 📄 Files\n\n");
        for file in &files {
            let label = file.name.strip_suffix(".md").unwrap_or(&file.name);
            toc.push_str(&format!("- [{}]({})\n", label, file.name));
        }
    }

    toc
}
