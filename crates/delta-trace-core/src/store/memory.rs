//! In-memory [`GraphStore`] implementation for tests and dry runs.
//!
//! Nodes and edges live in `BTreeMap`s behind one `std::sync::RwLock`, so each
//! upsert is atomic with respect to concurrent readers. A natural-key index
//! gives MERGE semantics. [`InMemoryGraphStore::set_online`] simulates an
//! unreachable backend.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use super::{
    apply_write, walk_node_ids, walk_paths, EdgeId, EdgeOutcome, GraphStore, NodeId, NodeKey,
    NodeWrite, PathRow, Pattern, PropertyMap, RelType, StoreError, StoredEdge, StoredNode,
    UpsertOutcome,
};

#[derive(Default)]
struct Inner {
    next_node: i64,
    next_edge: i64,
    nodes: BTreeMap<NodeId, StoredNode>,
    keys: BTreeMap<NodeKey, NodeId>,
    edges: BTreeMap<EdgeId, StoredEdge>,
}

impl Inner {
    fn incident(&self, node: NodeId) -> Vec<StoredEdge> {
        self.edges
            .values()
            .filter(|e| e.source == node || e.target == node)
            .cloned()
            .collect()
    }
}

/// In-memory graph store.
pub struct InMemoryGraphStore {
    inner: RwLock<Inner>,
    online: AtomicBool,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            online: AtomicBool::new(true),
        }
    }

    /// Toggle simulated availability. While offline every call fails with
    /// [`StoreError::Unavailable`].
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn node_count(&self) -> usize {
        self.inner.read().map(|g| g.nodes.len()).unwrap_or(0)
    }

    pub fn edge_count(&self) -> usize {
        self.inner.read().map(|g| g.edges.len()).unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable("in-memory store offline".into()))
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.ensure_online()?;
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.ensure_online()?;
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))
    }
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn connectivity_check(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    async fn upsert_node(&self, write: &NodeWrite) -> Result<UpsertOutcome, StoreError> {
        let mut inner = self.write()?;
        if let Some(id) = inner.keys.get(&write.key).copied() {
            if let Some(node) = inner.nodes.get_mut(&id) {
                apply_write(&mut node.properties, write, false);
                for label in write.labels() {
                    if !node.labels.contains(&label) {
                        node.labels.push(label);
                    }
                }
            }
            return Ok(UpsertOutcome { id, created: false });
        }

        inner.next_node += 1;
        let id = NodeId(inner.next_node);
        let mut properties = PropertyMap::new();
        apply_write(&mut properties, write, true);
        inner.nodes.insert(
            id,
            StoredNode {
                id,
                labels: write.labels(),
                properties,
            },
        );
        inner.keys.insert(write.key.clone(), id);
        Ok(UpsertOutcome { id, created: true })
    }

    async fn upsert_edge(
        &self,
        rel: RelType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> Result<EdgeOutcome, StoreError> {
        let mut inner = self.write()?;
        let source = *inner
            .keys
            .get(from)
            .ok_or_else(|| StoreError::NotFound(from.to_string()))?;
        let target = *inner
            .keys
            .get(to)
            .ok_or_else(|| StoreError::NotFound(to.to_string()))?;

        if let Some(existing) = inner
            .edges
            .values()
            .find(|e| e.rel_type == rel.as_str() && e.source == source && e.target == target)
        {
            return Ok(EdgeOutcome {
                id: existing.id,
                created: false,
            });
        }

        inner.next_edge += 1;
        let id = EdgeId(inner.next_edge);
        inner.edges.insert(
            id,
            StoredEdge {
                id,
                rel_type: rel.as_str().to_string(),
                source,
                target,
            },
        );
        Ok(EdgeOutcome { id, created: true })
    }

    async fn query(&self, pattern: &Pattern) -> Result<Vec<PathRow>, StoreError> {
        let inner = self.read()?;
        let single = |id: Option<NodeId>| -> Vec<PathRow> {
            id.and_then(|id| inner.nodes.get(&id))
                .map(|n| PathRow {
                    nodes: vec![n.clone()],
                    edges: Vec::new(),
                })
                .into_iter()
                .collect()
        };

        let rows = match pattern {
            Pattern::Node(key) => single(inner.keys.get(key).copied()),
            Pattern::NodeById(id) => single(Some(*id)),
            Pattern::KeyPrefix { label, prefix } => inner
                .keys
                .iter()
                .filter(|(k, _)| k.label == *label && k.key.starts_with(prefix.as_str()))
                .filter_map(|(_, id)| inner.nodes.get(id))
                .map(|n| PathRow {
                    nodes: vec![n.clone()],
                    edges: Vec::new(),
                })
                .collect(),
            Pattern::Neighborhood { root, max_hops } => {
                let Some(root_id) = inner.keys.get(root).copied() else {
                    return Ok(Vec::new());
                };
                walk_paths(root_id, *max_hops, |n| inner.incident(n))
                    .into_iter()
                    .map(|walk| PathRow {
                        nodes: walk_node_ids(root_id, &walk)
                            .iter()
                            .filter_map(|id| inner.nodes.get(id).cloned())
                            .collect(),
                        edges: walk,
                    })
                    .collect()
            }
        };
        Ok(rows)
    }

    async fn detach_delete(&self, key: &NodeKey) -> Result<usize, StoreError> {
        let mut inner = self.write()?;
        let Some(id) = inner.keys.remove(key) else {
            return Ok(0);
        };
        inner.nodes.remove(&id);
        let before = inner.edges.len();
        inner.edges.retain(|_, e| e.source != id && e.target != id);
        Ok(before - inner.edges.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use serde_json::json;

    #[test]
    fn upsert_is_idempotent_by_key() {
        let store = InMemoryGraphStore::new();
        let write = NodeWrite::new(NodeKey::case("c1")).set("status", "Novo");
        let first = block_on(store.upsert_node(&write)).unwrap();
        let second = block_on(store.upsert_node(&write)).unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn edges_are_idempotent_and_need_endpoints() {
        let store = InMemoryGraphStore::new();
        block_on(store.upsert_node(&NodeWrite::new(NodeKey::case("c1")))).unwrap();
        block_on(store.upsert_node(&NodeWrite::new(NodeKey::person("p1")))).unwrap();

        let a = block_on(store.upsert_edge(
            RelType::Target,
            &NodeKey::case("c1"),
            &NodeKey::person("p1"),
        ))
        .unwrap();
        let b = block_on(store.upsert_edge(
            RelType::Target,
            &NodeKey::case("c1"),
            &NodeKey::person("p1"),
        ))
        .unwrap();
        assert!(a.created && !b.created);
        assert_eq!(store.edge_count(), 1);

        let missing = block_on(store.upsert_edge(
            RelType::Target,
            &NodeKey::case("c1"),
            &NodeKey::person("nobody"),
        ));
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn neighborhood_reaches_two_hops_undirected() {
        let store = InMemoryGraphStore::new();
        for key in [
            NodeKey::case("c1"),
            NodeKey::person("p1"),
            NodeKey::entity("PHONE:1"),
            NodeKey::entity("ADDRESS:X"),
        ] {
            block_on(store.upsert_node(&NodeWrite::new(key))).unwrap();
        }
        block_on(store.upsert_edge(RelType::Target, &NodeKey::case("c1"), &NodeKey::person("p1")))
            .unwrap();
        block_on(store.upsert_edge(
            RelType::HasPhone,
            &NodeKey::person("p1"),
            &NodeKey::entity("PHONE:1"),
        ))
        .unwrap();
        // three hops away through the phone: not reached with max_hops = 2
        block_on(store.upsert_node(&NodeWrite::new(NodeKey::person("p2")))).unwrap();
        block_on(store.upsert_edge(
            RelType::HasPhone,
            &NodeKey::person("p2"),
            &NodeKey::entity("PHONE:1"),
        ))
        .unwrap();

        let rows = block_on(store.query(&Pattern::Neighborhood {
            root: NodeKey::case("c1"),
            max_hops: 2,
        }))
        .unwrap();
        let reached: Vec<_> = rows
            .iter()
            .flat_map(|r| r.nodes.iter().map(|n| n.properties.clone()))
            .collect();
        assert!(reached.iter().any(|p| p.get("key") == Some(&json!("PHONE:1"))));
        assert!(!reached
            .iter()
            .any(|p| p.get("external_ref") == Some(&json!("p2"))));
    }

    #[test]
    fn offline_store_fails_explicitly() {
        let store = InMemoryGraphStore::new();
        store.set_online(false);
        assert!(!block_on(store.connectivity_check()));
        let err = block_on(store.upsert_node(&NodeWrite::new(NodeKey::case("c1")))).unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[test]
    fn detach_delete_keeps_neighbors() {
        let store = InMemoryGraphStore::new();
        block_on(store.upsert_node(&NodeWrite::new(NodeKey::case("c1")))).unwrap();
        block_on(store.upsert_node(&NodeWrite::new(NodeKey::entity("PLACA:ABC1234")))).unwrap();
        block_on(store.upsert_edge(
            RelType::HasEvidence,
            &NodeKey::case("c1"),
            &NodeKey::entity("PLACA:ABC1234"),
        ))
        .unwrap();

        let removed = block_on(store.detach_delete(&NodeKey::case("c1"))).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.edge_count(), 0);
        assert_eq!(block_on(store.detach_delete(&NodeKey::case("c1"))).unwrap(), 0);
    }
}
