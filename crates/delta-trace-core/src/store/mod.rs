//! Property-graph storage abstraction for Delta Trace.
//!
//! The [`GraphStore`] trait is the only thing the assembler and the view
//! builder know about persistence. It exposes MERGE-style idempotent upserts
//! for nodes and edges, a small pattern query surface and a connectivity
//! probe, so any backend (SQLite, in-memory, a remote graph database) can sit
//! behind it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes, and each
//! individual upsert must be atomic.

pub mod memory;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Node and edge properties. Ordered so that serialized output is stable.
pub type PropertyMap = BTreeMap<String, Value>;

/// Store-native node identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Store-native edge identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub i64);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Primary label of a node. Each label has exactly one key property that
/// is unique across the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeLabel {
    Case,
    Person,
    Entity,
    Document,
}

impl NodeLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeLabel::Case => "Case",
            NodeLabel::Person => "Person",
            NodeLabel::Entity => "Entity",
            NodeLabel::Document => "Document",
        }
    }

    /// Name of the property holding the natural key.
    pub fn key_property(&self) -> &'static str {
        match self {
            NodeLabel::Case | NodeLabel::Document => "id",
            NodeLabel::Person => "external_ref",
            NodeLabel::Entity => "key",
        }
    }

    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Case" => Some(NodeLabel::Case),
            "Person" => Some(NodeLabel::Person),
            "Entity" => Some(NodeLabel::Entity),
            "Document" => Some(NodeLabel::Document),
            _ => None,
        }
    }
}

/// Natural-key reference to a node: primary label plus key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey {
    pub label: NodeLabel,
    pub key: String,
}

impl NodeKey {
    pub fn new(label: NodeLabel, key: impl Into<String>) -> Self {
        Self {
            label,
            key: key.into(),
        }
    }

    pub fn case(id: impl Into<String>) -> Self {
        Self::new(NodeLabel::Case, id)
    }

    pub fn person(external_ref: impl Into<String>) -> Self {
        Self::new(NodeLabel::Person, external_ref)
    }

    pub fn entity(key: impl Into<String>) -> Self {
        Self::new(NodeLabel::Entity, key)
    }

    pub fn document(id: impl Into<String>) -> Self {
        Self::new(NodeLabel::Document, id)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label.as_str(), self.key)
    }
}

/// A MERGE-style node write.
///
/// | Map | Applied on create | Applied on match |
/// |-----|-------------------|------------------|
/// | `on_create` | yes | no |
/// | `on_match` | no | yes |
/// | `set` | yes | yes |
///
/// `Null` values are never written, so a missing field coalesces over the
/// stored value instead of erasing it.
#[derive(Debug, Clone)]
pub struct NodeWrite {
    pub key: NodeKey,
    pub extra_labels: Vec<String>,
    pub on_create: PropertyMap,
    pub on_match: PropertyMap,
    pub set: PropertyMap,
}

impl NodeWrite {
    pub fn new(key: NodeKey) -> Self {
        Self {
            key,
            extra_labels: Vec::new(),
            on_create: PropertyMap::new(),
            on_match: PropertyMap::new(),
            set: PropertyMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.extra_labels.push(label.into());
        self
    }

    pub fn on_create(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.on_create.insert(name.to_string(), value.into());
        self
    }

    pub fn on_match(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.on_match.insert(name.to_string(), value.into());
        self
    }

    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.set.insert(name.to_string(), value.into());
        self
    }

    /// Full label set: primary label first.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = vec![self.key.label.as_str().to_string()];
        for extra in &self.extra_labels {
            if !labels.contains(extra) {
                labels.push(extra.clone());
            }
        }
        labels
    }
}

/// Merge a [`NodeWrite`] into a property map following the MERGE rules.
///
/// Shared by every backend so create/match semantics cannot drift.
pub fn apply_write(props: &mut PropertyMap, write: &NodeWrite, created: bool) {
    let phase = if created {
        props.insert(
            write.key.label.key_property().to_string(),
            Value::String(write.key.key.clone()),
        );
        &write.on_create
    } else {
        &write.on_match
    };
    for (name, value) in phase.iter().chain(write.set.iter()) {
        if !value.is_null() {
            props.insert(name.clone(), value.clone());
        }
    }
}

/// Relationship types written by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelType {
    RequestedBy,
    Target,
    Investigates,
    ContainsEvidence,
    SourceOf,
    HasPhone,
    LivesAt,
    HasEvidence,
}

impl RelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelType::RequestedBy => "REQUESTED_BY",
            RelType::Target => "TARGET",
            RelType::Investigates => "INVESTIGATES",
            RelType::ContainsEvidence => "CONTAINS_EVIDENCE",
            RelType::SourceOf => "SOURCE_OF",
            RelType::HasPhone => "HAS_PHONE",
            RelType::LivesAt => "LIVES_AT",
            RelType::HasEvidence => "HAS_EVIDENCE",
        }
    }
}

/// A node as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredNode {
    pub id: NodeId,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

impl StoredNode {
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    /// String property, ignoring empty strings.
    pub fn str_prop(&self, name: &str) -> Option<&str> {
        self.properties
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A directed edge as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredEdge {
    pub id: EdgeId,
    pub rel_type: String,
    pub source: NodeId,
    pub target: NodeId,
}

impl StoredEdge {
    /// The endpoint opposite `from`.
    pub fn other_end(&self, from: NodeId) -> NodeId {
        if self.source == from {
            self.target
        } else {
            self.source
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: NodeId,
    pub created: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeOutcome {
    pub id: EdgeId,
    pub created: bool,
}

/// Query patterns understood by every store.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A single node by natural key.
    Node(NodeKey),
    /// A single node by store identity.
    NodeById(NodeId),
    /// Every edge-unique undirected walk of 1..=`max_hops` edges from `root`.
    Neighborhood { root: NodeKey, max_hops: usize },
    /// Every node of `label` whose key starts with `prefix`.
    KeyPrefix { label: NodeLabel, prefix: String },
}

/// One matched path. For single-node patterns `edges` is empty.
///
/// For walks, `nodes[0]` is the root and `nodes[i + 1]` is reached through
/// `edges[i]`.
#[derive(Debug, Clone, Default)]
pub struct PathRow {
    pub nodes: Vec<StoredNode>,
    pub edges: Vec<StoredEdge>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("graph store unavailable: {0}")]
    Unavailable(String),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("graph store error: {0}")]
    Backend(String),
}

/// Abstract graph storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`connectivity_check`](GraphStore::connectivity_check) | Cheap liveness probe |
/// | [`upsert_node`](GraphStore::upsert_node) | MERGE a node by natural key |
/// | [`upsert_edge`](GraphStore::upsert_edge) | MERGE a typed edge between two keyed nodes |
/// | [`query`](GraphStore::query) | Pattern match returning path rows |
/// | [`detach_delete`](GraphStore::detach_delete) | Remove a node and its incident edges |
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn connectivity_check(&self) -> bool;

    /// Create or update the node identified by `write.key`.
    async fn upsert_node(&self, write: &NodeWrite) -> Result<UpsertOutcome, StoreError>;

    /// Assert a `rel` edge from `from` to `to`. Re-asserting is a no-op.
    ///
    /// Fails with [`StoreError::NotFound`] when an endpoint does not exist.
    async fn upsert_edge(
        &self,
        rel: RelType,
        from: &NodeKey,
        to: &NodeKey,
    ) -> Result<EdgeOutcome, StoreError>;

    async fn query(&self, pattern: &Pattern) -> Result<Vec<PathRow>, StoreError>;

    /// Delete one node and every edge touching it. Returns the number of
    /// edges removed, or `None`-equivalent `0` when the node was absent.
    async fn detach_delete(&self, key: &NodeKey) -> Result<usize, StoreError>;
}

/// Enumerate edge-unique walks of 1..=`max_hops` edges starting at `root`.
///
/// `incident` returns every edge touching a node regardless of direction.
/// Walks are emitted shortest first; a walk never reuses an edge.
pub fn walk_paths(
    root: NodeId,
    max_hops: usize,
    incident: impl Fn(NodeId) -> Vec<StoredEdge>,
) -> Vec<Vec<StoredEdge>> {
    let mut walks = Vec::new();
    let mut frontier: Vec<(NodeId, Vec<StoredEdge>)> = vec![(root, Vec::new())];

    for _ in 0..max_hops {
        let mut next = Vec::new();
        for (end, path) in &frontier {
            for edge in incident(*end) {
                if path.iter().any(|e| e.id == edge.id) {
                    continue;
                }
                let other = edge.other_end(*end);
                let mut extended = path.clone();
                extended.push(edge);
                walks.push(extended.clone());
                next.push((other, extended));
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }

    walks
}

/// Node ids visited by a walk from `root`, root included.
pub fn walk_node_ids(root: NodeId, walk: &[StoredEdge]) -> Vec<NodeId> {
    let mut ids = vec![root];
    let mut current = root;
    for edge in walk {
        current = edge.other_end(current);
        ids.push(current);
    }
    ids
}
