use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables and indexes. Safe to run repeatedly.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Tree nodes; rowid order is insertion order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tree_nodes (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL CHECK (length(name) > 0),
            parent_id TEXT REFERENCES tree_nodes(id) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('file', 'directory')),
            content_hash TEXT NOT NULL DEFAULT '',
            source_url TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One content record per node
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contents (
            id TEXT PRIMARY KEY,
            node_id TEXT NOT NULL UNIQUE REFERENCES tree_nodes(id) ON DELETE CASCADE,
            body TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_keys (
            id TEXT PRIMARY KEY,
            key TEXT NOT NULL,
            val TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            UNIQUE(key, val)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tree_nodes_parent_id ON tree_nodes(parent_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tree_nodes_name ON tree_nodes(parent_id, name)")
        .execute(pool)
        .await?;

    Ok(())
}
