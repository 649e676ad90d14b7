//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation to SQL against the schema created by
//! [`migrate`](crate::migrate). Persistence order is `rowid` order.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::models::{ContentRecord, NodeKind, TreeNode};
use crate::store::Store;

/// Key name under which trigger bearer tokens are stored.
const AUTH_KEY: &str = "auth";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_node(row: &SqliteRow) -> TreeNode {
    let kind: String = row.get("kind");
    TreeNode {
        id: row.get("id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
        kind: NodeKind::from_columns(&kind, row.get("content_hash"), row.get("source_url")),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn wipe_tree(&self) -> Result<()> {
        // Contents first so the wipe does not depend on cascade support
        sqlx::query("DELETE FROM contents")
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM tree_nodes")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_node(&self, node: &TreeNode) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO tree_nodes (id, name, parent_id, kind, content_hash, source_url)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&node.id)
        .bind(&node.name)
        .bind(&node.parent_id)
        .bind(node.kind.as_str())
        .bind(node.kind.content_hash())
        .bind(node.kind.source_url())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn children(&self, parent_id: &str) -> Result<Vec<TreeNode>> {
        let rows = sqlx::query(
            "SELECT id, name, parent_id, kind, content_hash, source_url FROM tree_nodes WHERE parent_id = ? ORDER BY rowid",
        )
        .bind(parent_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    async fn roots(&self) -> Result<Vec<TreeNode>> {
        let rows = sqlx::query(
            "SELECT id, name, parent_id, kind, content_hash, source_url FROM tree_nodes WHERE parent_id IS NULL ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_node).collect())
    }

    async fn find_child(&self, parent_id: Option<&str>, name: &str) -> Result<Option<TreeNode>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, parent_id, kind, content_hash, source_url
            FROM tree_nodes
            WHERE parent_id IS ? AND name = ?
            ORDER BY rowid
            LIMIT 1
            "#,
        )
        .bind(parent_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_node))
    }

    async fn count_nodes(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tree_nodes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn upsert_content(&self, node_id: &str, body: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            INSERT INTO contents (id, node_id, body, updated_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(node_id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(node_id)
        .bind(body)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_content(&self, node_id: &str) -> Result<Option<ContentRecord>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM contents WHERE node_id = ?")
                .bind(node_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(body.map(|body| ContentRecord {
            node_id: node_id.to_string(),
            body,
        }))
    }

    async fn count_contents(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn has_auth_key(&self, token: &str) -> Result<bool> {
        let found: bool =
            sqlx::query_scalar("SELECT COUNT(*) > 0 FROM auth_keys WHERE key = ? AND val = ?")
                .bind(AUTH_KEY)
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(found)
    }

    async fn add_auth_key(&self, token: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO auth_keys (id, key, val, created_at) VALUES (?, ?, ?, ?) ON CONFLICT(key, val) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(AUTH_KEY)
        .bind(token)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_auth_key(&self, token: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM auth_keys WHERE key = ? AND val = ?")
            .bind(AUTH_KEY)
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
