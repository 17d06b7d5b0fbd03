//! Domain types shared by the parser, the extractor and the assembler.
//!
//! [`Candidate`] is what the extractor produces. [`GraphEntity`] is what the
//! assembler writes: a tagged union where each variant carries only the
//! fields valid for that node type.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalize::{dedup_key, digits, format_phone};
use crate::store::{NodeKey, NodeWrite};

/// Sentinel for any field the source document did not provide.
pub const NOT_INFORMED: &str = "Não informado";

/// A parsed text field that defaults to [`NOT_INFORMED`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field(String);

impl Field {
    /// Empty or whitespace-only input collapses to the sentinel.
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self::default()
        } else {
            Field(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_informed(&self) -> bool {
        self.0 != NOT_INFORMED
    }

    /// `Some(value)` when informed.
    pub fn informed(&self) -> Option<&str> {
        self.is_informed().then_some(self.0.as_str())
    }
}

impl Default for Field {
    fn default() -> Self {
        Field(NOT_INFORMED.to_string())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        Field::new(value)
    }
}

/// Type tag of an extracted entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "PHONE")]
    Phone,
    #[serde(rename = "ADDRESS")]
    Address,
    #[serde(rename = "PLACA")]
    Vehicle,
    #[serde(rename = "CPF")]
    Cpf,
    #[serde(rename = "CNPJ")]
    Cnpj,
    #[serde(rename = "EMAIL")]
    Email,
}

impl EntityKind {
    pub fn tag(&self) -> &'static str {
        match self {
            EntityKind::Phone => "PHONE",
            EntityKind::Address => "ADDRESS",
            EntityKind::Vehicle => "PLACA",
            EntityKind::Cpf => "CPF",
            EntityKind::Cnpj => "CNPJ",
            EntityKind::Email => "EMAIL",
        }
    }

    /// Secondary node label next to `Entity`.
    pub fn node_label(&self) -> &'static str {
        match self {
            EntityKind::Phone => "Phone",
            EntityKind::Address => "Address",
            EntityKind::Vehicle => "Vehicle",
            EntityKind::Cpf | EntityKind::Cnpj | EntityKind::Email => "Identifier",
        }
    }
}

/// Who an entity is believed to belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceClass {
    #[serde(rename = "Pessoal")]
    Pessoal,
    #[serde(rename = "Vínculo Familiar")]
    VinculoFamiliar,
    #[serde(rename = "Terceiro")]
    Terceiro,
    #[serde(rename = "Veículo")]
    Veiculo,
    #[serde(rename = "Investigar")]
    Investigar,
}

impl SourceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceClass::Pessoal => "Pessoal",
            SourceClass::VinculoFamiliar => "Vínculo Familiar",
            SourceClass::Terceiro => "Terceiro",
            SourceClass::Veiculo => "Veículo",
            SourceClass::Investigar => "Investigar",
        }
    }
}

/// Named confidence tiers. The numeric score of a candidate is always the
/// score of its tier.
///
/// | Tier | Score | Assigned when |
/// |------|-------|---------------|
/// | `Confirmed` | 100 | target name inside the context window |
/// | `Plate` | 90 | any well-formed vehicle plate |
/// | `Family` | 75 | kinship word nearby, or a family-HQ address |
/// | `Baseline` | 50 | well-formed, no ownership signal |
/// | `Low` | 30 | CPFs failing the check digits |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceTier {
    Low,
    Baseline,
    Family,
    Plate,
    Confirmed,
}

impl ConfidenceTier {
    pub fn score(&self) -> u8 {
        match self {
            ConfidenceTier::Confirmed => 100,
            ConfidenceTier::Plate => 90,
            ConfidenceTier::Family => 75,
            ConfidenceTier::Baseline => 50,
            ConfidenceTier::Low => 30,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConfidenceTier::Confirmed => "Confirmado",
            ConfidenceTier::Plate => "Placa",
            ConfidenceTier::Family => "Familiar",
            ConfidenceTier::Baseline => "Base",
            ConfidenceTier::Low => "Baixa",
        }
    }
}

/// Family-HQ evidence attached to address candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Household {
    pub associated_names: Vec<String>,
    pub match_count: usize,
    pub is_family_hq: bool,
}

/// One entity proposed by the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub kind: EntityKind,
    pub value: String,
    pub tier: ConfidenceTier,
    pub confidence: u8,
    pub classification: SourceClass,
    pub owner: Option<String>,
    pub justification: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household: Option<Household>,
}

impl Candidate {
    pub fn new(
        kind: EntityKind,
        value: impl Into<String>,
        tier: ConfidenceTier,
        classification: SourceClass,
    ) -> Self {
        Self {
            kind,
            value: value.into(),
            tier,
            confidence: tier.score(),
            classification,
            owner: None,
            justification: String::new(),
            household: None,
        }
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(self.kind, &self.value)
    }

    pub fn is_family_hq(&self) -> bool {
        self.household.as_ref().is_some_and(|h| h.is_family_hq)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Solicitante,
    Investigado,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Solicitante => "Solicitante",
            Role::Investigado => "Investigado",
        }
    }
}

/// Person details as supplied by intake or derived from a dossier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub document: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl PersonRecord {
    pub fn name(&self) -> Option<&str> {
        present(&self.name)
    }

    pub fn email(&self) -> Option<&str> {
        present(&self.email)
    }

    pub fn phone(&self) -> Option<&str> {
        present(&self.phone)
    }

    pub fn document(&self) -> Option<&str> {
        present(&self.document)
    }

    /// Dedup key: lowercased email, else document digits, else
    /// `<name>_<case_id>`. `None` when the record is empty.
    pub fn external_ref(&self, case_id: &str) -> Option<String> {
        if let Some(email) = self.email() {
            return Some(email.to_lowercase());
        }
        if let Some(doc) = self.document() {
            let d = digits(doc);
            return Some(if d.is_empty() { doc.to_string() } else { d });
        }
        self.name()
            .map(|name| format!("{}_{}", name.to_uppercase(), case_id))
    }
}

/// A case registration request after payload decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseIntake {
    pub case_id: Option<String>,
    pub source: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub requester: Option<PersonRecord>,
    pub target: Option<PersonRecord>,
    pub labels: Vec<String>,
    pub raw_payload: Option<Value>,
}

/// Which pipeline stage produced a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Intake,
    Evidence,
    Dossier,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Intake => "intake",
            Origin::Evidence => "evidence",
            Origin::Dossier => "dossier",
        }
    }
}

/// Where a node write came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub origin: Origin,
    pub case_id: String,
    pub document_id: Option<String>,
}

impl Provenance {
    pub fn new(origin: Origin, case_id: impl Into<String>) -> Self {
        Self {
            origin,
            case_id: case_id.into(),
            document_id: None,
        }
    }

    pub fn with_document(mut self, document_id: Option<String>) -> Self {
        self.document_id = document_id;
        self
    }
}

/// Confidence and ownership data shared by every entity node.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub confidence: u8,
    pub classification: SourceClass,
    pub owner: Option<String>,
    pub justification: String,
}

impl Evidence {
    fn from_candidate(candidate: &Candidate) -> Self {
        Self {
            confidence: candidate.confidence,
            classification: candidate.classification,
            owner: candidate.owner.clone(),
            justification: candidate.justification.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    pub source: Option<String>,
    pub labels: Vec<String>,
    pub raw_intake: Option<String>,
}

impl CaseNode {
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            description: None,
            status: None,
            source: None,
            labels: Vec::new(),
            raw_intake: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PersonNode {
    pub external_ref: String,
    pub role: Role,
    pub record: PersonRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNode {
    pub digits: String,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressNode {
    pub full_address: String,
    pub household: Option<Household>,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleNode {
    pub plate: String,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierNode {
    pub kind: EntityKind,
    pub value: String,
    pub evidence: Evidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentNode {
    pub id: String,
    pub label: String,
    pub doc_type: String,
    pub content_type: Option<String>,
    pub content_hash: Option<String>,
}

/// Everything the assembler can write, one variant per node type.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphEntity {
    Case(CaseNode),
    Person(PersonNode),
    Phone(PhoneNode),
    Address(AddressNode),
    Vehicle(VehicleNode),
    Identifier(IdentifierNode),
    Document(DocumentNode),
}

fn opt(value: &Option<String>) -> Value {
    match present(value) {
        Some(s) => Value::String(s.to_string()),
        None => Value::Null,
    }
}

impl GraphEntity {
    pub fn from_candidate(candidate: &Candidate) -> Self {
        let evidence = Evidence::from_candidate(candidate);
        match candidate.kind {
            EntityKind::Phone => GraphEntity::Phone(PhoneNode {
                digits: digits(&candidate.value),
                evidence,
            }),
            EntityKind::Address => GraphEntity::Address(AddressNode {
                full_address: candidate.value.trim().to_uppercase(),
                household: candidate.household.clone(),
                evidence,
            }),
            EntityKind::Vehicle => GraphEntity::Vehicle(VehicleNode {
                plate: candidate.value.to_uppercase(),
                evidence,
            }),
            kind => GraphEntity::Identifier(IdentifierNode {
                kind,
                value: candidate.value.trim().to_string(),
                evidence,
            }),
        }
    }

    pub fn key(&self) -> NodeKey {
        match self {
            GraphEntity::Case(c) => NodeKey::case(&c.id),
            GraphEntity::Person(p) => NodeKey::person(&p.external_ref),
            GraphEntity::Phone(p) => NodeKey::entity(dedup_key(EntityKind::Phone, &p.digits)),
            GraphEntity::Address(a) => {
                NodeKey::entity(dedup_key(EntityKind::Address, &a.full_address))
            }
            GraphEntity::Vehicle(v) => NodeKey::entity(dedup_key(EntityKind::Vehicle, &v.plate)),
            GraphEntity::Identifier(i) => NodeKey::entity(dedup_key(i.kind, &i.value)),
            GraphEntity::Document(d) => NodeKey::document(&d.id),
        }
    }

    /// Translate into a MERGE write.
    pub fn to_write(&self, provenance: &Provenance, now: DateTime<Utc>) -> NodeWrite {
        let ts = now.to_rfc3339();
        let base = NodeWrite::new(self.key());
        match self {
            GraphEntity::Case(c) => {
                let mut write = base
                    .on_create("created_at", ts.as_str())
                    .on_create("updated_at", ts.as_str())
                    .on_create("title", c.id.as_str())
                    .on_match("updated_at", ts.as_str())
                    .set("title", opt(&c.title))
                    .set("description", opt(&c.description))
                    .set("status", opt(&c.status))
                    .set("source", opt(&c.source))
                    .set("raw_intake", opt(&c.raw_intake));
                if !c.labels.is_empty() {
                    write = write.set("labels_osint", c.labels.clone());
                }
                write
            }
            GraphEntity::Person(p) => base
                .on_create("created_at", ts.as_str())
                .on_create("origin", provenance.origin.as_str())
                .on_match("updated_at", ts.as_str())
                .set("name", opt(&p.record.name))
                .set("email", opt(&p.record.email))
                .set("phone", opt(&p.record.phone))
                .set("document", opt(&p.record.document))
                .on_create("role", p.role.as_str())
                .set("last_case_id", provenance.case_id.as_str()),
            GraphEntity::Phone(p) => entity_write(
                base,
                EntityKind::Phone,
                &p.evidence,
                provenance,
                &ts,
            )
            .set("number", format_phone(&p.digits))
            .set("digits", p.digits.as_str()),
            GraphEntity::Address(a) => {
                let mut write = entity_write(
                    base,
                    EntityKind::Address,
                    &a.evidence,
                    provenance,
                    &ts,
                )
                .set("full_address", a.full_address.as_str());
                if let Some(h) = &a.household {
                    write = write
                        .set("is_family_hq", h.is_family_hq)
                        .set("associated_names", h.associated_names.clone());
                }
                write
            }
            GraphEntity::Vehicle(v) => entity_write(
                base,
                EntityKind::Vehicle,
                &v.evidence,
                provenance,
                &ts,
            )
            .set("label", v.plate.as_str())
            .set("plate", v.plate.as_str()),
            GraphEntity::Identifier(i) => {
                entity_write(base, i.kind, &i.evidence, provenance, &ts)
                    .set("label", i.value.as_str())
            }
            GraphEntity::Document(d) => base
                .on_create("created_at", ts.as_str())
                .set("label", d.label.as_str())
                .set("type", d.doc_type.as_str())
                .set("content_type", opt(&d.content_type))
                .set("content_hash", opt(&d.content_hash))
                .set("case_id", provenance.case_id.as_str()),
        }
    }
}

fn entity_write(
    base: NodeWrite,
    kind: EntityKind,
    evidence: &Evidence,
    provenance: &Provenance,
    ts: &str,
) -> NodeWrite {
    base.with_label(kind.node_label())
        .on_create("type", kind.tag())
        .on_create("created_at", ts)
        .on_create("origin", provenance.origin.as_str())
        .on_match("updated_at", ts)
        .set("confidence", evidence.confidence)
        .set("source_class", evidence.classification.as_str())
        .set("owner", opt(&evidence.owner))
        .set("justification", evidence.justification.as_str())
        .set("last_case_id", provenance.case_id.as_str())
        .set(
            "last_document_id",
            provenance
                .document_id
                .as_deref()
                .map_or(Value::Null, |d| Value::String(d.to_string())),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{apply_write, PropertyMap};
    use serde_json::json;

    #[test]
    fn field_defaults_to_sentinel() {
        assert_eq!(Field::default().as_str(), NOT_INFORMED);
        assert_eq!(Field::new("   ").as_str(), NOT_INFORMED);
        assert_eq!(Field::new(" SP ").as_str(), "SP");
        assert!(Field::new("x").is_informed());
        assert_eq!(Field::default().informed(), None);
    }

    #[test]
    fn external_ref_fallback_chain() {
        let mut p = PersonRecord {
            name: Some("Ana Souza".into()),
            email: Some("Ana@Example.com".into()),
            document: Some("529.982.247-25".into()),
            phone: None,
        };
        assert_eq!(p.external_ref("c1").as_deref(), Some("ana@example.com"));
        p.email = Some("  ".into());
        assert_eq!(p.external_ref("c1").as_deref(), Some("52998224725"));
        p.document = None;
        assert_eq!(p.external_ref("c1").as_deref(), Some("ANA SOUZA_c1"));
        assert_eq!(PersonRecord::default().external_ref("c1"), None);
    }

    #[test]
    fn phone_candidate_becomes_keyed_entity() {
        let candidate = Candidate::new(
            EntityKind::Phone,
            "(11) 98765-4321",
            ConfidenceTier::Baseline,
            SourceClass::Terceiro,
        );
        let entity = GraphEntity::from_candidate(&candidate);
        assert_eq!(entity.key(), NodeKey::entity("PHONE:11987654321"));

        let write = entity.to_write(&Provenance::new(Origin::Evidence, "c1"), Utc::now());
        assert_eq!(write.labels(), vec!["Entity", "Phone"]);
        let mut props = PropertyMap::new();
        apply_write(&mut props, &write, true);
        assert_eq!(props["number"], json!("(11) 98765-4321"));
        assert_eq!(props["type"], json!("PHONE"));
        assert_eq!(props["confidence"], json!(50));
        assert!(!props.contains_key("owner"));
    }

    #[test]
    fn entity_type_tag_is_create_only() {
        let candidate = Candidate::new(
            EntityKind::Vehicle,
            "abc1d23",
            ConfidenceTier::Plate,
            SourceClass::Veiculo,
        );
        let write = GraphEntity::from_candidate(&candidate)
            .to_write(&Provenance::new(Origin::Evidence, "c1"), Utc::now());
        let mut props = PropertyMap::new();
        props.insert("type".into(), json!("LEGACY"));
        apply_write(&mut props, &write, false);
        assert_eq!(props["type"], json!("LEGACY"));
        assert_eq!(props["label"], json!("ABC1D23"));
    }

    #[test]
    fn tiers_map_to_scores() {
        assert_eq!(ConfidenceTier::Confirmed.score(), 100);
        assert_eq!(ConfidenceTier::Low.score(), 30);
        assert!(ConfidenceTier::Family > ConfidenceTier::Baseline);
    }
}
