//! Graph read commands: case view, node details and case deletion.

use anyhow::{bail, Result};

use delta_trace_core::assemble::delete_case;
use delta_trace_core::store::NodeId;
use delta_trace_core::view::{build_case_view, node_details, GraphView};

use crate::config::Config;
use crate::connection::GraphConnection;

/// Print the view JSON. When the store is unreachable the empty shape is
/// still printed so consumers always get `{"nodes": [], "edges": []}`,
/// and the command then fails.
pub async fn run_graph(config: &Config, case_id: &str) -> Result<()> {
    let conn = GraphConnection::from_config(config);
    let view = match conn.acquire().await {
        Ok(store) => build_case_view(store.as_ref(), case_id, &config.view_options()).await,
        Err(e) => Err(e),
    };

    match view {
        Ok(view) => {
            println!("{}", serde_json::to_string_pretty(&view)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&GraphView::default())?);
            Err(e.into())
        }
    }
}

pub async fn run_node(config: &Config, node_id: i64) -> Result<()> {
    let conn = GraphConnection::from_config(config);
    let store = conn.acquire().await?;
    match node_details(store.as_ref(), NodeId(node_id)).await? {
        Some(details) => {
            println!("{}", serde_json::to_string_pretty(&details)?);
            Ok(())
        }
        None => bail!("Node not found: {}", node_id),
    }
}

pub async fn run_delete_case(config: &Config, case_id: &str) -> Result<()> {
    let conn = GraphConnection::from_config(config);
    let store = conn.acquire().await?;
    let removed = delete_case(store.as_ref(), case_id).await?;
    println!("delete-case {}", case_id);
    println!("  edges removed: {}", removed);
    println!("ok");
    Ok(())
}
