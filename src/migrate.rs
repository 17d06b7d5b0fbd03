use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the node and edge tables. Safe to run repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Nodes: one row per (primary label, natural key)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS nodes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            label TEXT NOT NULL,
            key TEXT NOT NULL,
            labels_json TEXT NOT NULL DEFAULT '[]',
            props_json TEXT NOT NULL DEFAULT '{}',
            UNIQUE(label, key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Edges: one row per (type, source, target)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS edges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            rel_type TEXT NOT NULL,
            source INTEGER NOT NULL,
            target INTEGER NOT NULL,
            UNIQUE(rel_type, source, target),
            FOREIGN KEY (source) REFERENCES nodes(id),
            FOREIGN KEY (target) REFERENCES nodes(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_source ON edges(source)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_edges_target ON edges(target)")
        .execute(pool)
        .await?;

    Ok(())
}
