//! Evidence and dossier ingestion.
//!
//! Evidence: every `.pdf`/`.txt` under a path goes through the Entity
//! Extractor and lands in the case graph with a Document node as provenance.
//! Dossier: one report goes through the Section Parser; its subject becomes
//! the investigated person and its own records are written as confirmed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use uuid::Uuid;
use walkdir::WalkDir;

use delta_trace_core::assemble::{dossier_batch, AssemblyReport, EvidenceBatch, GraphAssembler};
use delta_trace_core::extract::EntityExtractor;
use delta_trace_core::models::{DocumentNode, PersonRecord};
use delta_trace_core::sections::ReportParser;
use delta_trace_core::store::memory::InMemoryGraphStore;
use delta_trace_core::store::GraphStore;

use crate::config::Config;
use crate::connection::GraphConnection;
use crate::extract::{content_type_for, read_document, LoadedDocument};

/// Where ingestion writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StoreKind {
    /// The configured SQLite graph database.
    Sqlite,
    /// A throwaway in-memory graph (dry run).
    Memory,
}

/// Counters over every file of one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub files: usize,
    pub empty_files: usize,
    pub entities_written: usize,
    pub skipped_low_confidence: usize,
    pub nodes_created: usize,
    pub edges_created: usize,
}

impl IngestSummary {
    fn add(&mut self, report: &AssemblyReport) {
        self.files += 1;
        self.entities_written += report.entities_written;
        self.skipped_low_confidence += report.skipped_low_confidence;
        self.nodes_created += report.nodes_created;
        self.edges_created += report.edges_created;
    }
}

/// Supported files under `path` in a stable order. A file path is returned
/// as-is when its type is supported.
pub fn collect_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        if content_type_for(path).is_none() {
            bail!("Unsupported file type: {}", path.display());
        }
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("No such file or directory: {}", path.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", path.display()))?;
        if entry.file_type().is_file() && content_type_for(entry.path()).is_some() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn document_node(doc: &LoadedDocument, doc_type: &str) -> DocumentNode {
    DocumentNode {
        id: Uuid::new_v4().to_string(),
        label: doc.file_name.clone(),
        doc_type: doc_type.to_string(),
        content_type: Some(doc.content_type.to_string()),
        content_hash: Some(doc.content_hash.clone()),
    }
}

/// Extract and assemble every file in `files` for one case.
///
/// `person` is the investigated person the evidence is about; when it has a
/// name that name is also the extraction target.
pub async fn ingest_evidence_files(
    store: &dyn GraphStore,
    config: &Config,
    case_id: &str,
    files: &[PathBuf],
    person: Option<PersonRecord>,
) -> Result<IngestSummary> {
    let target = person
        .as_ref()
        .and_then(|p| p.name())
        .unwrap_or_default()
        .to_string();
    let extractor = EntityExtractor::with_config(&target, config.extraction.clone());
    let assembler = GraphAssembler::new(store).with_min_confidence(config.graph.min_confidence);

    let mut summary = IngestSummary::default();
    for path in files {
        let doc = read_document(path)?;
        if doc.text.trim().is_empty() {
            warn!(path = %path.display(), "no text; document recorded without entities");
            summary.empty_files += 1;
        }
        let extraction = extractor.extract_all(&doc.text);

        let mut batch = EvidenceBatch::new(case_id, extraction.into_candidates())
            .with_document(document_node(&doc, "evidence"));
        if let Some(p) = &person {
            batch = batch.with_person(p.clone());
        }

        let report = assembler
            .ingest_evidence(&batch)
            .await
            .with_context(|| format!("Failed to assemble {}", path.display()))?;
        info!(
            path = %path.display(),
            written = report.entities_written,
            skipped = report.skipped_low_confidence,
            "evidence file ingested"
        );
        summary.add(&report);
    }
    Ok(summary)
}

/// Parse one dossier and assemble it for `case_id`.
pub async fn ingest_dossier_file(
    store: &dyn GraphStore,
    config: &Config,
    case_id: &str,
    path: &Path,
) -> Result<AssemblyReport> {
    let doc = read_document(path)?;
    let report = ReportParser::new().parse_text(&doc.text);
    let batch = dossier_batch(&report, case_id, Some(document_node(&doc, "dossier")));
    let assembled = GraphAssembler::new(store)
        .with_min_confidence(config.graph.min_confidence)
        .ingest_evidence(&batch)
        .await
        .with_context(|| format!("Failed to assemble dossier {}", path.display()))?;
    Ok(assembled)
}

async fn open_store(
    config: &Config,
    kind: StoreKind,
) -> Result<(Arc<dyn GraphStore>, Option<GraphConnection>)> {
    match kind {
        StoreKind::Memory => Ok((Arc::new(InMemoryGraphStore::new()), None)),
        StoreKind::Sqlite => {
            let conn = GraphConnection::from_config(config);
            let store = conn.acquire().await?;
            Ok((store, Some(conn)))
        }
    }
}

pub async fn run_ingest(
    config: &Config,
    case_id: &str,
    path: &Path,
    target: Option<String>,
    person_document: Option<String>,
    store_kind: StoreKind,
) -> Result<()> {
    let files = collect_files(path)?;
    let person = (target.is_some() || person_document.is_some()).then(|| PersonRecord {
        name: target,
        document: person_document,
        ..PersonRecord::default()
    });

    let (store, _conn) = open_store(config, store_kind).await?;
    let summary = ingest_evidence_files(store.as_ref(), config, case_id, &files, person).await?;

    println!("ingest {}", case_id);
    println!("  files: {}", summary.files);
    if summary.empty_files > 0 {
        println!("  files without text: {}", summary.empty_files);
    }
    println!("  entities written: {}", summary.entities_written);
    println!("  skipped (low confidence): {}", summary.skipped_low_confidence);
    println!("  nodes created: {}", summary.nodes_created);
    println!("  edges created: {}", summary.edges_created);
    if store_kind == StoreKind::Memory {
        println!("  store: memory (nothing persisted)");
    }
    println!("ok");
    Ok(())
}

pub async fn run_dossier(config: &Config, case_id: &str, path: &Path) -> Result<()> {
    let conn = GraphConnection::from_config(config);
    let store = conn.acquire().await?;
    let report = ingest_dossier_file(store.as_ref(), config, case_id, path).await?;

    println!("dossier {}", case_id);
    if let Some(doc) = &report.document_id {
        println!("  document: {}", doc);
    }
    println!("  entities written: {}", report.entities_written);
    println!("  nodes created: {}", report.nodes_created);
    println!("  nodes updated: {}", report.nodes_matched);
    println!("  edges created: {}", report.edges_created);
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_walked_for_supported_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("sub").join("a.pdf"), "a").unwrap();
        std::fs::write(dir.path().join("photo.jpg"), "x").unwrap();

        let files = collect_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.txt", "a.pdf"]);
    }

    #[test]
    fn unsupported_or_missing_paths_fail() {
        let dir = tempfile::tempdir().unwrap();
        let jpg = dir.path().join("photo.jpg");
        std::fs::write(&jpg, "x").unwrap();
        assert!(collect_files(&jpg).is_err());
        assert!(collect_files(&dir.path().join("missing")).is_err());
    }

    #[tokio::test]
    async fn evidence_text_lands_in_the_case_graph() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("relatorio.txt");
        std::fs::write(
            &file,
            "Alvo JOÃO DA SILVA visto com veiculo ABC-1234. Contato (11) 98765-4321.",
        )
        .unwrap();

        let store = InMemoryGraphStore::new();
        let person = PersonRecord {
            name: Some("João da Silva".to_string()),
            ..PersonRecord::default()
        };
        let summary = ingest_evidence_files(
            &store,
            &Config::minimal(),
            "DT-2025-001",
            &[file],
            Some(person),
        )
        .await
        .unwrap();

        assert_eq!(summary.files, 1);
        assert_eq!(summary.entities_written, 2);
        // case, person, document, phone, vehicle
        assert_eq!(store.node_count(), 5);
    }
}
