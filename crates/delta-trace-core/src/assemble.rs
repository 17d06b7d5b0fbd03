//! Graph Assembler: parsed or extracted data + case id → idempotent graph writes.
//!
//! The assembler owns no connection. It borrows a [`GraphStore`] for the
//! duration of one ingestion, checks connectivity once up front, then issues
//! one atomic upsert per node and edge. A failure midway leaves earlier writes
//! in place; re-running the same ingestion converges to the same graph.
//!
//! # Edges written
//!
//! | Edge | When |
//! |------|------|
//! | `Case -REQUESTED_BY-> Person` | intake with a requester name or email |
//! | `Case -TARGET-> Person` | intake with a target name or document |
//! | `Case -INVESTIGATES-> Person` | evidence or dossier with a resolved person |
//! | `Case -CONTAINS_EVIDENCE-> Document` | every uploaded file |
//! | `Document -SOURCE_OF-> Entity` | every entity written from a file |
//! | `Person -HAS_PHONE-> Entity` | phone, person resolved |
//! | `Person -LIVES_AT-> Entity` | address, person resolved |
//! | `Case -HAS_EVIDENCE-> Entity` | everything else |

use chrono::{Datelike, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::extract::phone::valid_phone_digits;
use crate::models::{
    Candidate, CaseIntake, CaseNode, ConfidenceTier, DocumentNode, EntityKind, GraphEntity,
    Origin, PersonNode, PersonRecord, Provenance, Role, SourceClass,
};
use crate::sections::DossierReport;
use crate::store::{
    EdgeOutcome, GraphStore, NodeKey, NodeLabel, Pattern, RelType, StoreError, UpsertOutcome,
};

/// Entities must score strictly above this to be written.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 30;
pub const DEFAULT_SOURCE: &str = "google_forms";
pub const DEFAULT_STATUS: &str = "Novo";

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("graph store unavailable after {attempts} attempt(s)")]
    StoreUnavailable { attempts: u32 },

    #[error("intake has no case id")]
    MissingCaseId,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Write counters for one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyReport {
    pub case_id: String,
    pub nodes_created: usize,
    pub nodes_matched: usize,
    pub edges_created: usize,
    pub edges_existing: usize,
    pub entities_written: usize,
    pub skipped_low_confidence: usize,
    pub document_id: Option<String>,
}

impl AssemblyReport {
    fn new(case_id: &str) -> Self {
        Self {
            case_id: case_id.to_string(),
            ..Self::default()
        }
    }

    fn node(&mut self, outcome: UpsertOutcome) {
        if outcome.created {
            self.nodes_created += 1;
        } else {
            self.nodes_matched += 1;
        }
    }

    fn edge(&mut self, outcome: EdgeOutcome) {
        if outcome.created {
            self.edges_created += 1;
        } else {
            self.edges_existing += 1;
        }
    }
}

/// Input for evidence and dossier ingestion.
#[derive(Debug, Clone)]
pub struct EvidenceBatch {
    pub case_id: String,
    pub origin: Origin,
    pub document: Option<DocumentNode>,
    pub person: Option<PersonRecord>,
    /// Overrides [`PersonRecord::external_ref`] when set.
    pub person_ref: Option<String>,
    pub candidates: Vec<Candidate>,
}

impl EvidenceBatch {
    pub fn new(case_id: impl Into<String>, candidates: Vec<Candidate>) -> Self {
        Self {
            case_id: case_id.into(),
            origin: Origin::Evidence,
            document: None,
            person: None,
            person_ref: None,
            candidates,
        }
    }

    pub fn with_document(mut self, document: DocumentNode) -> Self {
        self.document = Some(document);
        self
    }

    pub fn with_person(mut self, person: PersonRecord) -> Self {
        self.person = Some(person);
        self
    }
}

pub struct GraphAssembler<'a> {
    store: &'a dyn GraphStore,
    min_confidence: u8,
}

impl<'a> GraphAssembler<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self {
            store,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: u8) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    async fn ensure_available(&self) -> Result<(), AssembleError> {
        if self.store.connectivity_check().await {
            Ok(())
        } else {
            warn!("graph store failed connectivity check");
            Err(AssembleError::StoreUnavailable { attempts: 1 })
        }
    }

    async fn put(
        &self,
        entity: &GraphEntity,
        provenance: &Provenance,
        report: &mut AssemblyReport,
    ) -> Result<NodeKey, AssembleError> {
        let write = entity.to_write(provenance, Utc::now());
        let outcome = self.store.upsert_node(&write).await?;
        debug!(key = %write.key, created = outcome.created, "node upserted");
        report.node(outcome);
        Ok(write.key)
    }

    async fn link(
        &self,
        rel: RelType,
        from: &NodeKey,
        to: &NodeKey,
        report: &mut AssemblyReport,
    ) -> Result<(), AssembleError> {
        let outcome = self.store.upsert_edge(rel, from, to).await?;
        report.edge(outcome);
        Ok(())
    }

    /// Register or refresh a case from an intake payload. `intake.case_id`
    /// must already be resolved.
    pub async fn ingest_intake(&self, intake: &CaseIntake) -> Result<AssemblyReport, AssembleError> {
        let case_id = intake
            .case_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(AssembleError::MissingCaseId)?;
        self.ensure_available().await?;

        let mut report = AssemblyReport::new(case_id);
        let provenance = Provenance::new(Origin::Intake, case_id);

        let case = CaseNode {
            id: case_id.to_string(),
            title: intake.title.clone(),
            description: intake.description.clone(),
            status: Some(
                intake
                    .status
                    .clone()
                    .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            ),
            source: Some(
                intake
                    .source
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            ),
            labels: intake.labels.clone(),
            raw_intake: intake.raw_payload.as_ref().map(|v| v.to_string()),
        };
        let case_key = self
            .put(&GraphEntity::Case(case), &provenance, &mut report)
            .await?;

        if let Some(requester) = &intake.requester {
            if requester.name().is_some() || requester.email().is_some() {
                self.attach_person(
                    &case_key,
                    requester,
                    None,
                    Role::Solicitante,
                    RelType::RequestedBy,
                    &provenance,
                    &mut report,
                )
                .await?;
            }
        }
        if let Some(target) = &intake.target {
            if target.name().is_some() || target.document().is_some() {
                self.attach_person(
                    &case_key,
                    target,
                    None,
                    Role::Investigado,
                    RelType::Target,
                    &provenance,
                    &mut report,
                )
                .await?;
            }
        }

        info!(case_id, created = report.nodes_created, "intake assembled");
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    async fn attach_person(
        &self,
        case_key: &NodeKey,
        record: &PersonRecord,
        person_ref: Option<&str>,
        role: Role,
        rel: RelType,
        provenance: &Provenance,
        report: &mut AssemblyReport,
    ) -> Result<Option<NodeKey>, AssembleError> {
        let external_ref = match person_ref {
            Some(r) => r.to_string(),
            None => match record.external_ref(&provenance.case_id) {
                Some(r) => r,
                None => return Ok(None),
            },
        };
        let person = GraphEntity::Person(PersonNode {
            external_ref,
            role,
            record: record.clone(),
        });
        let key = self.put(&person, provenance, report).await?;
        self.link(rel, case_key, &key, report).await?;
        Ok(Some(key))
    }

    /// Write extracted or parsed entities for a case.
    ///
    /// The case node is created when missing. Entities at or below the
    /// minimum confidence are counted in `skipped_low_confidence` and never
    /// written.
    pub async fn ingest_evidence(
        &self,
        batch: &EvidenceBatch,
    ) -> Result<AssemblyReport, AssembleError> {
        self.ensure_available().await?;
        let case_id = batch.case_id.as_str();
        let mut report = AssemblyReport::new(case_id);
        let mut provenance = Provenance::new(batch.origin, case_id);

        let case_key = self
            .put(
                &GraphEntity::Case(CaseNode::bare(case_id)),
                &provenance,
                &mut report,
            )
            .await?;

        let person_key = match &batch.person {
            Some(record) => {
                self.attach_person(
                    &case_key,
                    record,
                    batch.person_ref.as_deref(),
                    Role::Investigado,
                    RelType::Investigates,
                    &provenance,
                    &mut report,
                )
                .await?
            }
            None => None,
        };

        let doc_key = match &batch.document {
            Some(doc) => {
                let key = self
                    .put(&GraphEntity::Document(doc.clone()), &provenance, &mut report)
                    .await?;
                self.link(RelType::ContainsEvidence, &case_key, &key, &mut report)
                    .await?;
                report.document_id = Some(doc.id.clone());
                provenance = provenance.with_document(Some(doc.id.clone()));
                Some(key)
            }
            None => None,
        };

        for candidate in &batch.candidates {
            if candidate.confidence <= self.min_confidence {
                report.skipped_low_confidence += 1;
                continue;
            }
            let entity = GraphEntity::from_candidate(candidate);
            let key = self.put(&entity, &provenance, &mut report).await?;
            if let Some(doc) = &doc_key {
                self.link(RelType::SourceOf, doc, &key, &mut report).await?;
            }
            match (&person_key, candidate.kind) {
                (Some(person), EntityKind::Phone) => {
                    self.link(RelType::HasPhone, person, &key, &mut report).await?
                }
                (Some(person), EntityKind::Address) => {
                    self.link(RelType::LivesAt, person, &key, &mut report).await?
                }
                _ => {
                    self.link(RelType::HasEvidence, &case_key, &key, &mut report)
                        .await?
                }
            }
            report.entities_written += 1;
        }

        info!(
            case_id,
            written = report.entities_written,
            skipped = report.skipped_low_confidence,
            "evidence assembled"
        );
        Ok(report)
    }
}

/// Turn a parsed dossier into an evidence batch.
///
/// The subject becomes an `Investigado` keyed by CPF digits (else
/// `<NAME>_<case_id>`). Dossier phones, addresses and e-mails are the
/// subject's own records and are written at the confirmed tier.
pub fn dossier_batch(
    report: &DossierReport,
    case_id: &str,
    document: Option<DocumentNode>,
) -> EvidenceBatch {
    let subject = report.subject();
    let owner = subject.name().map(str::to_string);
    let person_ref = report
        .subject_cpf()
        .or_else(|| owner.as_ref().map(|n| format!("{}_{}", n.to_uppercase(), case_id)));

    let confirmed = |kind: EntityKind, value: String, why: &str| {
        let mut c = Candidate::new(kind, value, ConfidenceTier::Confirmed, SourceClass::Pessoal);
        c.owner = owner.clone();
        c.justification = why.to_string();
        c
    };

    let mut candidates = Vec::new();
    for phone in &report.phones {
        if valid_phone_digits(&phone.number).is_some() {
            candidates.push(confirmed(
                EntityKind::Phone,
                phone.number.clone(),
                "dossier phone history",
            ));
        }
    }
    for address in &report.addresses {
        let Some(street) = address.street.informed() else {
            continue;
        };
        let mut full = street.to_string();
        for part in [&address.city_state, &address.cep] {
            if let Some(p) = part.informed() {
                full.push_str(", ");
                full.push_str(p);
            }
        }
        candidates.push(confirmed(EntityKind::Address, full, "dossier address history"));
    }
    for email in &report.emails {
        candidates.push(confirmed(
            EntityKind::Email,
            email.email.to_lowercase(),
            "dossier e-mail history",
        ));
    }

    EvidenceBatch {
        case_id: case_id.to_string(),
        origin: Origin::Dossier,
        document,
        person: person_ref.is_some().then_some(subject),
        person_ref,
        candidates,
    }
}

/// Next free `DT-<year>-<seq>` id. Falls back to `DT-<year>-<6 hex>` when
/// the store cannot be queried.
pub async fn next_case_id(store: &dyn GraphStore, year: i32) -> String {
    let prefix = format!("DT-{year}-");
    let pattern = Pattern::KeyPrefix {
        label: NodeLabel::Case,
        prefix: prefix.clone(),
    };
    match store.query(&pattern).await {
        Ok(rows) => {
            let max = rows
                .iter()
                .flat_map(|r| r.nodes.first())
                .filter_map(|n| n.str_prop("id"))
                .filter_map(|id| id.strip_prefix(prefix.as_str()))
                .filter_map(|seq| seq.parse::<u64>().ok())
                .max()
                .unwrap_or(0);
            format!("{prefix}{:03}", max.saturating_add(1))
        }
        Err(e) => {
            warn!(error = %e, "case id lookup failed; using random suffix");
            fallback_case_id(year)
        }
    }
}

pub fn fallback_case_id(year: i32) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("DT-{year}-{}", hex[..6].to_uppercase())
}

pub fn current_year() -> i32 {
    Utc::now().year()
}

/// Delete a case node and its own edges. Shared nodes stay.
pub async fn delete_case(store: &dyn GraphStore, case_id: &str) -> Result<usize, AssembleError> {
    if !store.connectivity_check().await {
        return Err(AssembleError::StoreUnavailable { attempts: 1 });
    }
    let removed = store.detach_delete(&NodeKey::case(case_id)).await?;
    info!(case_id, edges_removed = removed, "case deleted");
    Ok(removed)
}
