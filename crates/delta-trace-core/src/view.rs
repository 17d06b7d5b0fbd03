//! Graph View Builder: a case's 1–2 hop neighborhood as positioned nodes and
//! edges for a visualization client.
//!
//! Output shape:
//!
//! ```json
//! {"nodes": [{"id", "type", "label", "attributes", "position"}],
//!  "edges": [{"id", "source", "target"}]}
//! ```

use std::collections::HashSet;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::NOT_INFORMED;
use crate::store::{GraphStore, NodeId, NodeKey, Pattern, PropertyMap, StoreError, StoredNode};

/// Display label for nodes with no usable property.
pub const UNNAMED: &str = "Sem Nome";

/// Labels that carry no information; such nodes are hidden.
const PLACEHOLDER_LABELS: &[&str] = &[UNNAMED, NOT_INFORMED, "NÃO IDENTIFICADO", "???", "Unknown", "N/I", ""];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// Case at the center, every other node on a circle around it.
    #[default]
    Circular,
    /// All positions at the origin; the client lays the graph out.
    Client,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewOptions {
    pub layout: Layout,
    pub radius: f64,
    pub center: (f64, f64),
    pub max_hops: usize,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            layout: Layout::Circular,
            radius: 280.0,
            center: (400.0, 300.0),
            max_hops: 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Case,
    Person,
    Phone,
    Address,
    Document,
    Default,
}

impl NodeKind {
    pub fn classify(node: &StoredNode) -> Self {
        if node.has_label("Case") {
            NodeKind::Case
        } else if node.has_label("Person") {
            NodeKind::Person
        } else if node.has_label("Phone") {
            NodeKind::Phone
        } else if node.has_label("Address") {
            NodeKind::Address
        } else if node.has_label("Document") {
            NodeKind::Document
        } else {
            NodeKind::Default
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub label: String,
    pub attributes: PropertyMap,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEdge {
    pub id: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphView {
    pub nodes: Vec<ViewNode>,
    pub edges: Vec<ViewEdge>,
}

/// Labels and properties of one stored node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDetails {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: PropertyMap,
}

/// Display label: `label`, then `name`/`number`/`full_address`, then
/// `title`, then [`UNNAMED`].
pub fn display_label(node: &StoredNode) -> String {
    ["label", "name", "number", "full_address", "title"]
        .iter()
        .find_map(|p| node.str_prop(p))
        .unwrap_or(UNNAMED)
        .to_string()
}

pub fn is_placeholder(label: &str) -> bool {
    let label = label.trim();
    PLACEHOLDER_LABELS
        .iter()
        .any(|p| p.to_lowercase() == label.to_lowercase())
}

/// Build the positioned view of one case.
///
/// An unreachable store is an error. A missing case yields an empty view;
/// a case without neighbors yields the case node alone.
pub async fn build_case_view(
    store: &dyn GraphStore,
    case_id: &str,
    options: &ViewOptions,
) -> Result<GraphView, StoreError> {
    if !store.connectivity_check().await {
        return Err(StoreError::Unavailable("connectivity check failed".into()));
    }

    let root = NodeKey::case(case_id);
    let mut rows = store
        .query(&Pattern::Neighborhood {
            root: root.clone(),
            max_hops: options.max_hops,
        })
        .await?;
    if rows.is_empty() {
        rows = store.query(&Pattern::Node(root)).await?;
    }

    let mut seen_nodes = HashSet::new();
    let mut seen_edges = HashSet::new();
    let mut nodes: Vec<StoredNode> = Vec::new();
    let mut edges = Vec::new();
    for row in rows {
        for node in row.nodes {
            if seen_nodes.insert(node.id) {
                nodes.push(node);
            }
        }
        for edge in row.edges {
            if seen_edges.insert(edge.id) {
                edges.push(edge);
            }
        }
    }

    let root_id = nodes
        .iter()
        .find(|n| n.has_label("Case") && n.str_prop("id") == Some(case_id))
        .map(|n| n.id);

    let mut kept: Vec<(StoredNode, String)> = Vec::new();
    for node in nodes {
        let label = display_label(&node);
        if Some(node.id) != root_id && is_placeholder(&label) {
            continue;
        }
        kept.push((node, label));
    }
    let kept_ids: HashSet<NodeId> = kept.iter().map(|(n, _)| n.id).collect();

    let others = kept.iter().filter(|(n, _)| Some(n.id) != root_id).count();
    let mut index = 0usize;
    let mut view = GraphView::default();
    for (node, label) in kept {
        let is_root = Some(node.id) == root_id;
        let position = match options.layout {
            Layout::Client => Position { x: 0.0, y: 0.0 },
            Layout::Circular if is_root => Position {
                x: options.center.0,
                y: options.center.1,
            },
            Layout::Circular => {
                let angle = 2.0 * PI * index as f64 / others as f64;
                index += 1;
                Position {
                    x: options.center.0 + options.radius * angle.cos(),
                    y: options.center.1 + options.radius * angle.sin(),
                }
            }
        };
        view.nodes.push(ViewNode {
            id: node.id.0.to_string(),
            kind: NodeKind::classify(&node),
            label,
            attributes: node.properties,
            position,
        });
    }

    view.edges = edges
        .into_iter()
        .filter(|e| kept_ids.contains(&e.source) && kept_ids.contains(&e.target))
        .map(|e| ViewEdge {
            id: e.id.0.to_string(),
            source: e.source.0.to_string(),
            target: e.target.0.to_string(),
        })
        .collect();

    debug!(case_id, nodes = view.nodes.len(), edges = view.edges.len(), "case view built");
    Ok(view)
}

/// Labels and properties of one node, `None` when absent.
pub async fn node_details(
    store: &dyn GraphStore,
    node_id: NodeId,
) -> Result<Option<NodeDetails>, StoreError> {
    if !store.connectivity_check().await {
        return Err(StoreError::Unavailable("connectivity check failed".into()));
    }
    let rows = store.query(&Pattern::NodeById(node_id)).await?;
    Ok(rows
        .into_iter()
        .flat_map(|r| r.nodes)
        .next()
        .map(|n| NodeDetails {
            id: n.id.0.to_string(),
            labels: n.labels,
            properties: n.properties,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryGraphStore;
    use crate::store::{NodeWrite, RelType};
    use futures::executor::block_on;

    fn seed(store: &InMemoryGraphStore, write: NodeWrite) {
        block_on(store.upsert_node(&write)).unwrap();
    }

    fn link(store: &InMemoryGraphStore, rel: RelType, from: NodeKey, to: NodeKey) {
        block_on(store.upsert_edge(rel, &from, &to)).unwrap();
    }

    #[test]
    fn lone_case_is_one_node_zero_edges() {
        let store = InMemoryGraphStore::new();
        seed(&store, NodeWrite::new(NodeKey::case("c1")).set("title", "Caso 1"));
        let view = block_on(build_case_view(&store, "c1", &ViewOptions::default())).unwrap();
        assert_eq!(view.nodes.len(), 1);
        assert!(view.edges.is_empty());
        assert_eq!(view.nodes[0].kind, NodeKind::Case);
        assert_eq!(view.nodes[0].label, "Caso 1");
        assert_eq!(view.nodes[0].position, Position { x: 400.0, y: 300.0 });
    }

    #[test]
    fn missing_case_is_empty_and_offline_is_error() {
        let store = InMemoryGraphStore::new();
        let view = block_on(build_case_view(&store, "nope", &ViewOptions::default())).unwrap();
        assert_eq!(view, GraphView::default());

        store.set_online(false);
        assert!(block_on(build_case_view(&store, "nope", &ViewOptions::default())).is_err());
    }

    #[test]
    fn neighbors_are_classified_positioned_and_filtered() {
        let store = InMemoryGraphStore::new();
        seed(&store, NodeWrite::new(NodeKey::case("c1")));
        seed(
            &store,
            NodeWrite::new(NodeKey::person("p1")).set("name", "JOÃO DA SILVA"),
        );
        seed(
            &store,
            NodeWrite::new(NodeKey::entity("PHONE:11987654321"))
                .with_label("Phone")
                .set("number", "(11) 98765-4321"),
        );
        seed(
            &store,
            NodeWrite::new(NodeKey::person("p2")).set("name", "Não informado"),
        );
        link(&store, RelType::Target, NodeKey::case("c1"), NodeKey::person("p1"));
        link(
            &store,
            RelType::HasPhone,
            NodeKey::person("p1"),
            NodeKey::entity("PHONE:11987654321"),
        );
        link(&store, RelType::RequestedBy, NodeKey::case("c1"), NodeKey::person("p2"));

        let view = block_on(build_case_view(&store, "c1", &ViewOptions::default())).unwrap();
        let kinds: Vec<_> = view.nodes.iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NodeKind::Case, NodeKind::Person, NodeKind::Phone]);
        // the root case is never filtered, even when unnamed
        assert_eq!(view.nodes[0].label, UNNAMED);
        assert_eq!(view.edges.len(), 2);

        let person = &view.nodes[1];
        assert!((person.position.x - 680.0).abs() < 1e-9);
        assert!((person.position.y - 300.0).abs() < 1e-9);
        let phone = &view.nodes[2];
        assert!((phone.position.x - 120.0).abs() < 1e-9);
    }

    #[test]
    fn client_layout_leaves_positions_at_origin() {
        let store = InMemoryGraphStore::new();
        seed(&store, NodeWrite::new(NodeKey::case("c1")).set("title", "T"));
        let options = ViewOptions {
            layout: Layout::Client,
            ..ViewOptions::default()
        };
        let view = block_on(build_case_view(&store, "c1", &options)).unwrap();
        assert_eq!(view.nodes[0].position, Position { x: 0.0, y: 0.0 });
    }

    #[test]
    fn placeholder_matching_ignores_case() {
        assert!(is_placeholder("não identificado"));
        assert!(is_placeholder("unknown"));
        assert!(is_placeholder(" "));
        assert!(!is_placeholder("Maria"));
    }

    #[test]
    fn details_of_one_node() {
        let store = InMemoryGraphStore::new();
        let outcome =
            block_on(store.upsert_node(&NodeWrite::new(NodeKey::case("c1")).set("status", "Novo")))
                .unwrap();
        let details = block_on(node_details(&store, outcome.id)).unwrap().unwrap();
        assert_eq!(details.labels, vec!["Case"]);
        assert_eq!(details.properties["status"], serde_json::json!("Novo"));
        assert!(block_on(node_details(&store, NodeId(999))).unwrap().is_none());
    }
}
