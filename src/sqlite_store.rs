//! SQLite-backed [`GraphStore`] implementation.
//!
//! Nodes are rows keyed by `(label, key)` with their label list and
//! properties stored as JSON text; edges are rows keyed by
//! `(rel_type, source, target)`. Each upsert runs in its own transaction so a
//! concurrent writer never observes a half-applied MERGE.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use delta_trace_core::store::{
    apply_write, walk_node_ids, walk_paths, EdgeId, EdgeOutcome, GraphStore, NodeId, NodeKey,
    NodeWrite, PathRow, Pattern, PropertyMap, RelType, StoreError, StoredEdge, StoredNode,
    UpsertOutcome,
};

/// SQLite implementation of the [`GraphStore`] trait.
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

    async fn node_id(&self, key: &NodeKey) -> Result<Option<NodeId>, StoreError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM nodes WHERE label = ? AND key = ?")
            .bind(key.label.as_str())
            .bind(&key.key)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(id.map(NodeId))
    }

    async fn nodes_by_id(
        &self,
        ids: &BTreeSet<NodeId>,
    ) -> Result<HashMap<NodeId, StoredNode>, StoreError> {
        let mut out = HashMap::new();
        for id in ids {
            let row = sqlx::query("SELECT id, labels_json, props_json FROM nodes WHERE id = ?")
                .bind(id.0)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
            if let Some(row) = row {
                out.insert(*id, node_from_row(&row)?);
            }
        }
        Ok(out)
    }

    async fn incident(&self, node: NodeId) -> Result<Vec<StoredEdge>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, rel_type, source, target FROM edges WHERE source = ? OR target = ? ORDER BY id",
        )
        .bind(node.0)
        .bind(node.0)
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        Ok(rows.iter().map(edge_from_row).collect())
    }

    async fn neighborhood(
        &self,
        root: &NodeKey,
        max_hops: usize,
    ) -> Result<Vec<PathRow>, StoreError> {
        let Some(root_id) = self.node_id(root).await? else {
            return Ok(Vec::new());
        };

        // Load incident edges hop by hop, then walk the loaded subgraph.
        let mut incident: HashMap<NodeId, Vec<StoredEdge>> = HashMap::new();
        let mut frontier = vec![root_id];
        for _ in 0..max_hops {
            let mut next = Vec::new();
            for node in frontier {
                if incident.contains_key(&node) {
                    continue;
                }
                let edges = self.incident(node).await?;
                next.extend(edges.iter().map(|e| e.other_end(node)));
                incident.insert(node, edges);
            }
            frontier = next;
        }

        let walks = walk_paths(root_id, max_hops, |n| {
            incident.get(&n).cloned().unwrap_or_default()
        });

        let ids: BTreeSet<NodeId> = walks
            .iter()
            .flat_map(|w| walk_node_ids(root_id, w))
            .collect();
        let nodes = self.nodes_by_id(&ids).await?;

        Ok(walks
            .into_iter()
            .map(|walk| PathRow {
                nodes: walk_node_ids(root_id, &walk)
                    .iter()
                    .filter_map(|id| nodes.get(id).cloned())
                    .collect(),
                edges: walk,
            })
            .collect())
    }
}

fn store_err(e: sqlx::Error) -> StoreError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(e.to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

fn json_err(e: serde_json::Error) -> StoreError {
    StoreError::Backend(format!("corrupt node payload: {e}"))
}

fn node_from_row(row: &SqliteRow) -> Result<StoredNode, StoreError> {
    let labels_json: String = row.get("labels_json");
    let props_json: String = row.get("props_json");
    Ok(StoredNode {
        id: NodeId(row.get("id")),
        labels: serde_json::from_str(&labels_json).map_err(json_err)?,
        properties: serde_json::from_str(&props_json).map_err(json_err)?,
    })
}

fn edge_from_row(row: &SqliteRow) -> StoredEdge {
    StoredEdge {
        id: EdgeId(row.get("id")),
        rel_type: row.get("rel_type"),
        source: NodeId(row.get("source")),
        target: NodeId(row.get("target")),
    }
}

fn single(node: StoredNode) -> PathRow {
    PathRow {
        nodes: vec![node],
        edges: Vec::new(),
    }
}

#[async_trait]
impl GraphStore for SqliteStore {
    async fn connectivity_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    async fn upsert_node(&self, write: &NodeWrite) -> Result<UpsertOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;

        let mut created_props = PropertyMap::new();
        apply_write(&mut created_props, write, true);
        let labels = write.labels();

        // The insert takes the write lock, so the read-modify-write below
        // cannot interleave with another upsert of the same key.
        let inserted = sqlx::query(
            "INSERT INTO nodes (label, key, labels_json, props_json) VALUES (?, ?, ?, ?) \
             ON CONFLICT(label, key) DO NOTHING",
        )
        .bind(write.key.label.as_str())
        .bind(&write.key.key)
        .bind(serde_json::to_string(&labels).map_err(json_err)?)
        .bind(serde_json::to_string(&created_props).map_err(json_err)?)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        if inserted.rows_affected() == 1 {
            let id = NodeId(inserted.last_insert_rowid());
            tx.commit().await.map_err(store_err)?;
            return Ok(UpsertOutcome { id, created: true });
        }

        let row = sqlx::query(
            "SELECT id, labels_json, props_json FROM nodes WHERE label = ? AND key = ?",
        )
        .bind(write.key.label.as_str())
        .bind(&write.key.key)
        .fetch_one(&mut *tx)
        .await
        .map_err(store_err)?;
        let mut node = node_from_row(&row)?;

        apply_write(&mut node.properties, write, false);
        for label in labels {
            if !node.labels.contains(&label) {
                node.labels.push(label);
            }
        }

        sqlx::query("UPDATE nodes SET labels_json = ?, props_json = ? WHERE id = ?")
            .bind(serde_json::to_string(&node.labels).map_err(json_err)?)
            .bind(serde_json::to_string(&node.properties).map_err(json_err)?)
            .bind(node.id.0)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;

        Ok(UpsertOutcome {
            id: node.id,
            created: false,
        })
    }

    async fn upsert_edge(
        &self,
        rel: RelType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> Result<EdgeOutcome, StoreError> {
        let source = self
            .node_id(from)
            .await?
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        let target = self
            .node_id(to)
            .await?
            .ok_or_else(|| StoreError::NotFound(to.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let inserted = sqlx::query(
            "INSERT INTO edges (rel_type, source, target) VALUES (?, ?, ?) \
             ON CONFLICT(rel_type, source, target) DO NOTHING",
        )
        .bind(rel.as_str())
        .bind(source.0)
        .bind(target.0)
        .execute(&mut *tx)
        .await
        .map_err(store_err)?;

        let outcome = if inserted.rows_affected() == 1 {
            EdgeOutcome {
                id: EdgeId(inserted.last_insert_rowid()),
                created: true,
            }
        } else {
            let id: i64 = sqlx::query_scalar(
                "SELECT id FROM edges WHERE rel_type = ? AND source = ? AND target = ?",
            )
            .bind(rel.as_str())
            .bind(source.0)
            .bind(target.0)
            .fetch_one(&mut *tx)
            .await
            .map_err(store_err)?;
            EdgeOutcome {
                id: EdgeId(id),
                created: false,
            }
        };
        tx.commit().await.map_err(store_err)?;
        Ok(outcome)
    }

    async fn query(&self, pattern: &Pattern) -> Result<Vec<PathRow>, StoreError> {
        match pattern {
            Pattern::Node(key) => {
                let row = sqlx::query(
                    "SELECT id, labels_json, props_json FROM nodes WHERE label = ? AND key = ?",
                )
                .bind(key.label.as_str())
                .bind(&key.key)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_err)?;
                row.map(|r| node_from_row(&r).map(single))
                    .into_iter()
                    .collect()
            }
            Pattern::NodeById(id) => {
                let row = sqlx::query("SELECT id, labels_json, props_json FROM nodes WHERE id = ?")
                    .bind(id.0)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(store_err)?;
                row.map(|r| node_from_row(&r).map(single))
                    .into_iter()
                    .collect()
            }
            Pattern::KeyPrefix { label, prefix } => {
                let rows = sqlx::query(
                    "SELECT id, labels_json, props_json FROM nodes \
                     WHERE label = ? AND substr(key, 1, length(?)) = ? ORDER BY key",
                )
                .bind(label.as_str())
                .bind(prefix)
                .bind(prefix)
                .fetch_all(&self.pool)
                .await
                .map_err(store_err)?;
                rows.iter().map(|r| node_from_row(r).map(single)).collect()
            }
            Pattern::Neighborhood { root, max_hops } => self.neighborhood(root, *max_hops).await,
        }
    }

    async fn detach_delete(&self, key: &NodeKey) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await.map_err(store_err)?;
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM nodes WHERE label = ? AND key = ?")
            .bind(key.label.as_str())
            .bind(&key.key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(store_err)?;
        let Some(id) = id else {
            return Ok(0);
        };

        let removed = sqlx::query("DELETE FROM edges WHERE source = ? OR target = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?
            .rows_affected();
        sqlx::query("DELETE FROM nodes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(store_err)?;
        tx.commit().await.map_err(store_err)?;
        Ok(removed as usize)
    }
}
