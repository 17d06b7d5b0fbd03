//! Case intake: decode an external registration payload, resolve the case
//! id and write the case with its requester and target.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use delta_trace_core::assemble::{current_year, next_case_id, AssemblyReport, GraphAssembler};
use delta_trace_core::models::{CaseIntake, PersonRecord};
use delta_trace_core::store::GraphStore;

use crate::config::Config;
use crate::connection::GraphConnection;

/// Registration payload as sent by the intake form integration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntakePayload {
    #[serde(default)]
    pub case_id: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub solicitante: Option<PersonRecord>,
    #[serde(default)]
    pub investigado: Option<PersonRecord>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub raw_payload: Option<Value>,
}

impl IntakePayload {
    fn supplied_case_id(&self) -> Option<&str> {
        self.case_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    fn into_intake(self, case_id: String) -> CaseIntake {
        let raw_payload = self.raw_payload.filter(|raw| match raw {
            Value::Null => false,
            Value::Object(map) => !map.is_empty(),
            _ => true,
        });
        CaseIntake {
            case_id: Some(case_id),
            source: self.source,
            title: self.title,
            description: self.description,
            status: self.status,
            requester: self.solicitante,
            target: self.investigado,
            labels: self.labels,
            raw_payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntakeReceipt {
    pub status: String,
    pub case_id: String,
    pub message: String,
    /// True when the case id was generated rather than supplied.
    pub generated_id: bool,
}

/// Register one case. A missing case id is replaced by the next
/// `DT-<year>-<seq>` id.
pub async fn register_case(
    store: &dyn GraphStore,
    payload: IntakePayload,
    min_confidence: u8,
) -> Result<(IntakeReceipt, AssemblyReport)> {
    let (case_id, generated_id) = match payload.supplied_case_id() {
        Some(id) => (id.to_string(), false),
        None => (next_case_id(store, current_year()).await, true),
    };

    let intake = payload.into_intake(case_id.clone());
    let report = GraphAssembler::new(store)
        .with_min_confidence(min_confidence)
        .ingest_intake(&intake)
        .await
        .with_context(|| format!("Failed to register case {case_id}"))?;

    let receipt = IntakeReceipt {
        status: "ok".to_string(),
        case_id,
        message: "Case registered.".to_string(),
        generated_id,
    };
    Ok((receipt, report))
}

pub async fn run_intake(config: &Config, payload_path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(payload_path)
        .with_context(|| format!("Failed to read payload: {}", payload_path.display()))?;
    let payload: IntakePayload =
        serde_json::from_str(&content).with_context(|| "Failed to parse intake payload")?;

    let conn = GraphConnection::from_config(config);
    let store = conn.acquire().await?;
    let (receipt, report) =
        register_case(store.as_ref(), payload, config.graph.min_confidence).await?;

    info!(
        case_id = %receipt.case_id,
        created = report.nodes_created,
        matched = report.nodes_matched,
        edges = report.edges_created,
        "case registered"
    );
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use delta_trace_core::store::memory::InMemoryGraphStore;
    use delta_trace_core::store::{NodeKey, Pattern};
    use serde_json::json;

    fn payload(value: Value) -> IntakePayload {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn missing_case_id_is_generated_in_sequence() {
        let store = InMemoryGraphStore::new();
        let (first, _) = register_case(&store, payload(json!({"title": "A"})), 30)
            .await
            .unwrap();
        let (second, _) = register_case(&store, payload(json!({"case_id": "  "})), 30)
            .await
            .unwrap();
        let year = current_year();
        assert!(first.generated_id);
        assert_eq!(first.case_id, format!("DT-{year}-001"));
        assert_eq!(second.case_id, format!("DT-{year}-002"));
    }

    #[tokio::test]
    async fn supplied_case_id_is_kept_with_people() {
        let store = InMemoryGraphStore::new();
        let body = json!({
            "case_id": "DT-2024-042",
            "labels": ["fraude"],
            "solicitante": {"name": "Ana Lima", "email": "Ana@Example.com"},
            "investigado": {"name": "João da Silva", "document": "529.982.247-25"},
            "raw_payload": {}
        });
        let (receipt, report) = register_case(&store, payload(body), 30).await.unwrap();
        assert!(!receipt.generated_id);
        assert_eq!(receipt.status, "ok");
        assert_eq!(report.nodes_created, 3);
        assert_eq!(report.edges_created, 2);

        let rows = store
            .query(&Pattern::Node(NodeKey::case("DT-2024-042")))
            .await
            .unwrap();
        let case = &rows[0].nodes[0];
        assert_eq!(case.properties["labels_osint"], json!(["fraude"]));
        assert!(!case.properties.contains_key("raw_intake"));
    }

    #[tokio::test]
    async fn unreachable_store_fails() {
        let store = InMemoryGraphStore::new();
        store.set_online(false);
        assert!(register_case(&store, payload(json!({"case_id": "c1"})), 30)
            .await
            .is_err());
    }
}
