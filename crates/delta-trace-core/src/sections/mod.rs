//! Section Parser: dossier text lines → typed report sections.
//!
//! Input is the text extracted from a person dossier export, split into
//! trimmed, non-empty lines ([`split_lines`]). Output is a [`DossierReport`]
//! whose every field defaults to [`NOT_INFORMED`](crate::models::NOT_INFORMED)
//! or an empty list. Parsing never fails: missing anchors leave defaults,
//! malformed tax identifiers land in [`DossierReport::unformatted_ids`].
//!
//! # Sections
//!
//! | Section | Strategy |
//! |---------|----------|
//! | meta, identity, tax registry, documents | [`FieldRule`] tables: value after anchor |
//! | career, socio profile, mosaic | fixed offsets from an anchor |
//! | phones, carriers, emails, professions, relatives | [`RowRule`] tables + row matchers |
//! | addresses | [`AddressBlockRule`] (default [`PriorityBackScan`]) |
//! | credit flags | prefix scan until an `...Internet` line |
//! | scores | one regex over the whole text |

pub mod address;
pub mod rules;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::models::{Field, PersonRecord, NOT_INFORMED};
use crate::normalize::{collapse_whitespace, digits, title_case, TaxId};

pub use address::{AddressBlockRule, AddressEntry, PriorityBackScan};
pub use rules::{apply_fields, scan_rows, FieldRule, Lines, RowRule};

static META_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2}/\d{2}/\d{4}, \d{2}:\d{2})").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());
static DATE_OR_NI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}|N/I").unwrap());
static DATETIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4} \d{2}:\d{2}:\d{2}").unwrap());
static PHONE_ROW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(\d{2}\)\s*[\d-]+").unwrap());
static PRIORITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PRIORIDADE:\s*([0-9.]+)").unwrap());
static CREDIT_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+Internet").unwrap());
static CSB8_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)SCORE\s*\(CSB8\).*?(\d{1,4})\s*/1000.*?Risco:\s*([A-ZÇÃÉÍÓÚ ]+)").unwrap()
});
static CSBA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)SCORE\s*\(CSBA\).*?(\d{1,4})\s*/1000.*?Risco:\s*([A-ZÇÃÉÍÓÚ ]+)").unwrap()
});

/// Split extracted text into trimmed, non-empty lines.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

// ─── Report types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DossierReport {
    pub meta: Meta,
    pub identity: Identity,
    pub tax_registry: TaxRegistry,
    pub career: Career,
    pub phones: Vec<PhoneEntry>,
    pub carriers: Vec<CarrierEntry>,
    pub emails: Vec<EmailEntry>,
    pub addresses: Vec<AddressEntry>,
    pub relatives: Vec<Relative>,
    pub socio: SocioProfile,
    pub mosaic: Mosaic,
    pub documents: Documents,
    pub credit_flags: CreditFlags,
    pub scores: Scores,
    /// Tax identifiers that could not be grouped; kept verbatim.
    pub unformatted_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Meta {
    pub timestamp: Field,
    pub protocol: Field,
    pub requester: Field,
    pub reference_cpf: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Identity {
    pub name: Field,
    /// Display form, e.g. `529.982.247-25 (Regular)`.
    pub cpf: Field,
    pub birth_date: Field,
    pub sex: Field,
    pub marital_status: Field,
    pub mother: Field,
    pub father: Field,
    pub nationality: Field,
    pub profession: Field,
    pub declared_income: Field,
    pub income_band: Field,
    pub registry_email: Field,
    pub updated_at: Field,
    pub control_code: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TaxRegistry {
    pub name: Field,
    pub cpf: Field,
    pub voter_id: Field,
    pub sex: Field,
    pub birth_date: Field,
    pub status: Field,
    pub nationality: Field,
    pub resident_abroad: Field,
    pub address: Field,
    pub phone: Field,
    pub updated_at: Field,
    /// Last two words of the registered name history line.
    pub name_log: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Career {
    pub education: Field,
    pub professions: Vec<Profession>,
    pub rais: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profession {
    pub title: Field,
    pub date: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhoneEntry {
    pub number: String,
    pub updated_at: Field,
    pub priority: Field,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarrierEntry {
    pub phone: String,
    pub date: Field,
    pub carrier: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmailEntry {
    pub email: String,
    pub date: Field,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relative {
    pub relation: Field,
    pub name: Field,
    pub cpf: TaxId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SocioProfile {
    pub social_class: Field,
    pub modeled_income: Field,
    pub purchasing_power: Field,
    pub income_target: Field,
    pub credit_risk: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Mosaic {
    pub credit_segment: Field,
    pub target_segment: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Documents {
    pub pis: Field,
    pub nis: Field,
    pub rg: Field,
    pub irpf: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreditFlags {
    pub updated_at: Field,
    pub purpose: Field,
    pub mobile_profile: Field,
    pub premium_client: Field,
    pub luxury_profile: Field,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scores {
    pub csb8_value: Field,
    pub csb8_label: Field,
    pub csba_value: Field,
    pub csba_label: Field,
}

impl DossierReport {
    /// CPF digits of the report subject, when an 11-digit CPF was found.
    pub fn subject_cpf(&self) -> Option<String> {
        let d = digits(self.meta.reference_cpf.informed()?);
        (d.len() == 11).then_some(d)
    }

    /// The report subject as a person record for graph assembly.
    pub fn subject(&self) -> PersonRecord {
        let owned = |f: &Field| f.informed().map(str::to_string);
        PersonRecord {
            name: owned(&self.identity.name),
            email: self
                .identity
                .registry_email
                .informed()
                .filter(|e| e.contains('@'))
                .map(str::to_string),
            phone: self.phones.first().map(|p| p.number.clone()),
            document: self.subject_cpf(),
        }
    }
}

// ─── Rule tables ─────────────────────────────────────────────────────────

const EMAIL_HEADERS: &[&str] = &["✉  E-MAILS", "E-MAILS", "E-MAIL", "EMAILS", "EMAIL"];

const IDENTITY_FIELDS: &[FieldRule<Identity>] = &[
    FieldRule { anchor: "Nome Completo", set: |r, v| r.name = v },
    FieldRule { anchor: "Nome da Mãe", set: |r, v| r.mother = v },
    FieldRule { anchor: "Nome do Pai", set: |r, v| r.father = v },
    FieldRule { anchor: "CPF", set: |r, v| r.cpf = v },
    FieldRule { anchor: "Data de Nascimento", set: |r, v| r.birth_date = v },
    FieldRule { anchor: "Sexo", set: |r, v| r.sex = v },
    FieldRule { anchor: "Estado Civil", set: |r, v| r.marital_status = v },
    FieldRule { anchor: "Renda", set: |r, v| r.declared_income = v },
    FieldRule { anchor: "Faixa de Renda", set: |r, v| r.income_band = v },
    FieldRule { anchor: "Nacionalidade", set: |r, v| r.nationality = v },
    FieldRule { anchor: "Email", set: |r, v| r.registry_email = v },
    FieldRule { anchor: "Data Atualização", set: |r, v| r.updated_at = v },
    FieldRule { anchor: "Código Controle", set: |r, v| r.control_code = v },
];

const TAX_REGISTRY_ANCHORS: &[&str] = &["RECEITA FEDERAL (2023)", "RECEITA FEDERAL"];

const TAX_REGISTRY_FIELDS: &[FieldRule<TaxRegistry>] = &[
    FieldRule { anchor: "Nome", set: |r, v| r.name = v },
    FieldRule { anchor: "CPF", set: |r, v| r.cpf = v },
    FieldRule { anchor: "Titulo Eleitor", set: |r, v| r.voter_id = v },
    FieldRule { anchor: "Sexo", set: |r, v| r.sex = v },
    FieldRule { anchor: "Nascimento", set: |r, v| r.birth_date = v },
    FieldRule { anchor: "Situação Cadastral", set: |r, v| r.status = v },
    FieldRule { anchor: "Nacionalidade", set: |r, v| r.nationality = v },
    FieldRule { anchor: "Residente Exterior", set: |r, v| r.resident_abroad = v },
    FieldRule { anchor: "Endereço", set: |r, v| r.address = v },
    FieldRule { anchor: "Telefone", set: |r, v| r.phone = v },
    FieldRule { anchor: "Data Atualização", set: |r, v| r.updated_at = v },
];

const DOCUMENT_FIELDS: &[FieldRule<Documents>] = &[
    FieldRule { anchor: "PIS", set: |r, v| r.pis = v },
    FieldRule { anchor: "NIS", set: |r, v| r.nis = v },
    FieldRule { anchor: "RG", set: |r, v| r.rg = v },
    FieldRule { anchor: "IMPOSTO DE RENDA (IRPF)", set: |r, v| r.irpf = v },
];

const PHONE_ROWS: RowRule = RowRule {
    headers: &["TELEFONES"],
    skip: 1,
    terminators: &["HISTÓRICO OPERADORAS"],
    consume: 2,
};

const CARRIER_ROWS: RowRule = RowRule {
    headers: &["TELEFONE DATA OPERADORA ATALHO"],
    skip: 1,
    terminators: EMAIL_HEADERS,
    consume: 3,
};

const EMAIL_ROWS: RowRule = RowRule {
    headers: EMAIL_HEADERS,
    skip: 1,
    terminators: &["ENDEREÇOS"],
    consume: 1,
};

const PROFESSION_ROWS: RowRule = RowRule {
    headers: &["HISTÓRICO PROFISSIONAL"],
    skip: 2,
    terminators: &["RAIS"],
    consume: 2,
};

const RELATIVE_ROWS: RowRule = RowRule {
    headers: &["PARENTES"],
    skip: 2,
    terminators: &["CLASSE SOCIAL"],
    consume: 3,
};

/// The address block runs from two lines below its header to the relatives
/// header; rows are handled by the [`AddressBlockRule`].
const ADDRESS_BLOCK: RowRule = RowRule {
    headers: &["ENDEREÇOS"],
    skip: 2,
    terminators: &["PARENTES"],
    consume: 1,
};

/// Lines inside the relatives table that are page furniture, not data.
fn is_relative_noise(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.contains("http")
        || lower.contains("mind7")
        || lower.contains("consultas")
        || lower.contains("vinculo")
        || (line.contains(' ') && line.matches('/').count() > 3)
}

// ─── Parser ──────────────────────────────────────────────────────────────

/// Parses dossier lines into a [`DossierReport`].
pub struct ReportParser {
    address_rule: Box<dyn AddressBlockRule>,
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportParser {
    pub fn new() -> Self {
        Self {
            address_rule: Box::new(PriorityBackScan),
        }
    }

    pub fn with_address_rule(rule: Box<dyn AddressBlockRule>) -> Self {
        Self { address_rule: rule }
    }

    pub fn parse_text(&self, text: &str) -> DossierReport {
        self.parse(&split_lines(text))
    }

    pub fn parse(&self, raw: &[String]) -> DossierReport {
        let lines = Lines::new(raw);
        let mut report = DossierReport::default();
        if lines.is_empty() {
            debug!("empty dossier; returning defaults");
            return report;
        }

        let cpf_raw = lines.value_after("CPF", 0);
        report.identity = parse_identity(&lines, &cpf_raw, &mut report.unformatted_ids);
        report.meta = parse_meta(&lines, &cpf_raw);
        report.tax_registry = parse_tax_registry(&lines);
        report.career = parse_career(&lines);
        report.phones = parse_phones(&lines);
        report.carriers = parse_carriers(&lines);
        report.emails = parse_emails(&lines);
        report.addresses = ADDRESS_BLOCK
            .bounds(&lines, 0)
            .map(|(from, to)| self.address_rule.reconstruct(lines.slice(from, to)))
            .unwrap_or_default();
        report.relatives = parse_relatives(&lines);
        for relative in &report.relatives {
            if let TaxId::Unformatted(raw) = &relative.cpf {
                if !raw.is_empty() {
                    report.unformatted_ids.push(raw.clone());
                }
            }
        }
        report.socio = parse_socio(&lines);
        report.mosaic = parse_mosaic(&lines);
        report.documents = parse_documents(&lines);
        report.credit_flags = parse_credit_flags(&lines);
        report.scores = parse_scores(&raw.join("\n"));

        debug!(
            phones = report.phones.len(),
            emails = report.emails.len(),
            addresses = report.addresses.len(),
            relatives = report.relatives.len(),
            "dossier parsed"
        );
        report
    }
}

fn parse_meta(lines: &Lines<'_>, cpf_raw: &Field) -> Meta {
    let cpf_digits = cpf_raw.informed().map(digits).unwrap_or_default();
    Meta {
        timestamp: Field::new(
            META_RE
                .captures(lines.at(0))
                .map(|c| c[1].to_string())
                .unwrap_or_default(),
        ),
        protocol: if cpf_digits.is_empty() {
            Field::default()
        } else {
            Field::new(format!("DT-CPF-{cpf_digits}"))
        },
        requester: Field::new("ADMIN"),
        reference_cpf: cpf_raw
            .informed()
            .map(|c| Field::new(TaxId::parse(c).as_str()))
            .unwrap_or_default(),
    }
}

fn parse_identity(lines: &Lines<'_>, cpf_raw: &Field, unformatted: &mut Vec<String>) -> Identity {
    let mut identity = Identity::default();
    apply_fields(lines, 0, IDENTITY_FIELDS, &mut identity);

    identity.cpf = match cpf_raw.informed() {
        Some(raw) => {
            let id = TaxId::parse(raw);
            if !id.is_formatted() {
                unformatted.push(id.as_str().to_string());
            }
            Field::new(format!("{} (Regular)", id.as_str()))
        }
        None => Field::default(),
    };

    identity.sex = match identity.sex.as_str().trim().to_uppercase().as_str() {
        "F" => Field::new("Feminino"),
        "M" => Field::new("Masculino"),
        _ => identity.sex,
    };

    if !identity.nationality.is_informed() {
        identity.nationality = Field::new("Brasileiro(a)");
    }

    if let Some(income) = identity.declared_income.informed() {
        identity.declared_income = Field::new(format!(
            "{} (Faixa {})",
            income,
            identity.income_band.as_str()
        ));
    }
    identity
}

fn parse_tax_registry(lines: &Lines<'_>) -> TaxRegistry {
    let mut registry = TaxRegistry::default();
    if let Some(start) = lines.find_any(TAX_REGISTRY_ANCHORS, 0) {
        apply_fields(lines, start, TAX_REGISTRY_FIELDS, &mut registry);
    }
    if let Some(idx) = lines.find("NOME NA RECEITA", 0) {
        let parts: Vec<&str> = lines.at(idx + 2).split_whitespace().collect();
        if parts.len() >= 3 {
            registry.name_log = Field::new(parts[parts.len() - 2..].join(" "));
        }
    }
    registry
}

fn parse_career(lines: &Lines<'_>) -> Career {
    let mut career = Career::default();
    let Some(scope) = lines.find("NÍVEL DATA INCLUSÃO", 0) else {
        return career;
    };
    career.education = lines.get(scope + 1).map(Field::new).unwrap_or_default();
    career.professions = scan_rows(lines, scope, &PROFESSION_ROWS, |l, i| {
        let date = l.get(i + 1)?;
        DATE_RE.is_match(date).then(|| Profession {
            title: Field::new(l.at(i)),
            date: Field::new(date),
        })
    });
    if let Some(rais) = lines.find("RAIS", scope) {
        career.rais = lines.get(rais + 2).map(Field::new).unwrap_or_default();
    }
    career
}

fn parse_phones(lines: &Lines<'_>) -> Vec<PhoneEntry> {
    scan_rows(lines, 0, &PHONE_ROWS, |l, i| {
        let line = l.at(i);
        let number = PHONE_ROW_RE.find(line)?.as_str().to_string();
        let next = l.at(i + 1);
        let included = DATE_RE.find(line).map(|m| m.as_str());
        let updated = DATE_OR_NI_RE.find(next).map(|m| m.as_str()).or(included);
        Some(PhoneEntry {
            number,
            updated_at: Field::new(updated.unwrap_or("")),
            priority: Field::new(
                PRIORITY_RE
                    .captures(next)
                    .map(|c| c[1].to_string())
                    .unwrap_or_default(),
            ),
            note: next
                .to_uppercase()
                .contains("WHATSAPP")
                .then(|| "WhatsApp ativo".to_string()),
        })
    })
}

fn parse_carriers(lines: &Lines<'_>) -> Vec<CarrierEntry> {
    scan_rows(lines, 0, &CARRIER_ROWS, |l, i| {
        PHONE_ROW_RE.is_match(l.at(i)).then(|| CarrierEntry {
            phone: l.at(i).to_string(),
            date: Field::new(l.at(i + 1)),
            carrier: Field::new(l.at(i + 2)),
        })
    })
}

fn parse_emails(lines: &Lines<'_>) -> Vec<EmailEntry> {
    scan_rows(lines, 0, &EMAIL_ROWS, |l, i| {
        let line = l.at(i);
        if !line.contains('@') {
            return None;
        }
        let date = (i + 1..(i + 6).min(l.len()))
            .find_map(|j| DATE_RE.find(l.at(j)).map(|m| m.as_str()))
            .unwrap_or("");
        Some(EmailEntry {
            email: line.trim().to_string(),
            date: Field::new(date),
        })
    })
}

fn parse_relatives(lines: &Lines<'_>) -> Vec<Relative> {
    scan_rows(lines, 0, &RELATIVE_ROWS, |l, i| {
        if is_relative_noise(l.at(i)) || i + 2 >= l.len() {
            return None;
        }
        if is_relative_noise(l.at(i + 1)) || is_relative_noise(l.at(i + 2)) {
            return None;
        }
        Some(Relative {
            relation: Field::new(l.at(i)),
            name: Field::new(l.at(i + 1)),
            cpf: TaxId::parse(l.at(i + 2)),
        })
    })
}

fn parse_socio(lines: &Lines<'_>) -> SocioProfile {
    let mut socio = SocioProfile::default();
    let Some(class_idx) = lines.find("CLASSE SOCIAL", 0) else {
        return socio;
    };
    let span = |anchor: &str, len: usize| -> Field {
        lines
            .find(anchor, class_idx)
            .filter(|idx| idx + 2 < lines.len())
            .map(|idx| Field::new(collapse_whitespace(&lines.join(idx + 2, idx + 2 + len))))
            .unwrap_or_default()
    };
    socio.social_class = lines.get(class_idx + 2).map(Field::new).unwrap_or_default();
    socio.modeled_income = span("INFORMAÇÕES DE CRÉDITO", 2);
    socio.purchasing_power = span("PODER AQUISITIVO", 3);
    socio.income_target = span("TARGET DE RENDA", 3);
    socio.credit_risk = span("RISCO DE CRÉDITO", 4);
    socio
}

fn parse_mosaic(lines: &Lines<'_>) -> Mosaic {
    let mut mosaic = Mosaic::default();
    if let Some(first) = lines.find("Segmento", 0) {
        mosaic.credit_segment = Field::new(lines.join(first + 1, first + 6));
        if let Some(second) = lines.find("Segmento", first + 1) {
            mosaic.target_segment = Field::new(lines.join(second + 1, second + 6));
        }
    }
    mosaic
}

fn parse_documents(lines: &Lines<'_>) -> Documents {
    let mut docs = Documents::default();
    if let Some(start) = lines.find("DOCUMENTOS", 0) {
        apply_fields(lines, start, DOCUMENT_FIELDS, &mut docs);
    }
    docs
}

fn parse_credit_flags(lines: &Lines<'_>) -> CreditFlags {
    let mut flags = CreditFlags::default();
    let Some(start) = lines.find("CREDIT ANALYTICS", 0) else {
        return flags;
    };
    let last_word = |l: &str| Field::new(l.split_whitespace().last().unwrap_or(""));
    for i in start..lines.len() {
        let line = lines.at(i);
        if line.starts_with("Data Atualização") {
            if let Some(m) = DATETIME_RE.find(&lines.join(i, i + 2)) {
                flags.updated_at = Field::new(m.as_str());
            }
        } else if line.starts_with("Finalidade") {
            flags.purpose = Field::new(line.split_whitespace().skip(1).collect::<Vec<_>>().join(" "));
        } else if line.starts_with("Perfil Mobile") {
            flags.mobile_profile = last_word(line);
        } else if line.starts_with("ClientePremium") || line.starts_with("Cliente Premium") {
            flags.premium_client = last_word(line);
        } else if line.starts_with("Perfil Luxo") {
            flags.luxury_profile = last_word(line);
        }
        if CREDIT_END_RE.is_match(line) {
            break;
        }
    }
    flags
}

fn parse_scores(full_text: &str) -> Scores {
    let mut scores = Scores::default();
    if let Some(c) = CSB8_RE.captures(full_text) {
        scores.csb8_value = Field::new(&c[1]);
        scores.csb8_label = Field::new(format!("Risco {}", title_case(&c[2])));
    }
    if let Some(c) = CSBA_RE.captures(full_text) {
        scores.csba_value = Field::new(&c[1]);
        scores.csba_label = Field::new(format!("Risco {}", title_case(&c[2])));
    }
    scores
}

/// True when every identity field carries the sentinel.
pub fn identity_is_blank(identity: &Identity) -> bool {
    [
        &identity.name,
        &identity.cpf,
        &identity.birth_date,
        &identity.mother,
        &identity.father,
        &identity.registry_email,
    ]
    .iter()
    .all(|f| f.as_str() == NOT_INFORMED)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> DossierReport {
        ReportParser::new().parse_text(raw)
    }

    const SAMPLE: &str = "\
12/05/2025, 14:30 - Relatório
Nome Completo
JOÃO DA SILVA
Nome da Mãe
MARIA DA SILVA
CPF
52998224725
Sexo
M
Renda
R$ 1.200,00
Faixa de Renda
2
Email
joao@example.com
RECEITA FEDERAL (2023)
Nome
JOAO DA SILVA
Situação Cadastral
REGULAR
NOME NA RECEITA
cabecalho
2019 JOAO SILVA
NÍVEL DATA INCLUSÃO
ENSINO MEDIO
HISTÓRICO PROFISSIONAL
CARGO DATA
MOTORISTA
01/02/2018
RAIS
cabecalho
SEM VINCULO
📞 TELEFONES
(11) 98765-4321 01/01/2020
02/02/2024 PRIORIDADE: 1 WHATSAPP
(11) 3456-7890
N/I PRIORIDADE: 2.5
HISTÓRICO OPERADORAS
TELEFONE DATA OPERADORA ATALHO
(11) 98765-4321
01/01/2020
VIVO
✉  E-MAILS
EMAIL DATA
joao@example.com
cadastro
03/03/2023
ENDEREÇOS
ENDERECO CIDADE
RUA DAS FLORES 123
SAO PAULO/SP 01234-
Bairro: CENTRO 567 10:11:12
Prioridade: 1
PARENTES
VINCULO NOME CPF
MAE
MARIA DA SILVA
111.222.333
https://consultas.example/x
CLASSE SOCIAL
cabecalho
CLASSE D
DOCUMENTOS
PIS
123.45678.90-1
CREDIT ANALYTICS
Finalidade Marketing Direto
Perfil Mobile SIM
Perfil Luxo NAO
TelefoneInternet
Perfil Luxo SIM
SCORE (CSB8)
420 /1000
Risco: MUITO ALTO
";

    #[test]
    fn empty_input_yields_defaults() {
        let report = ReportParser::new().parse(&[]);
        assert!(identity_is_blank(&report.identity));
        assert_eq!(report.identity.name.as_str(), NOT_INFORMED);
        assert_eq!(report.meta.protocol.as_str(), NOT_INFORMED);
        assert!(report.phones.is_empty());
        assert!(report.addresses.is_empty());
        assert!(report.unformatted_ids.is_empty());
    }

    #[test]
    fn identity_and_meta() {
        let r = parse(SAMPLE);
        assert_eq!(r.meta.timestamp.as_str(), "12/05/2025, 14:30");
        assert_eq!(r.meta.protocol.as_str(), "DT-CPF-52998224725");
        assert_eq!(r.meta.reference_cpf.as_str(), "529.982.247-25");
        assert_eq!(r.identity.name.as_str(), "JOÃO DA SILVA");
        assert_eq!(r.identity.cpf.as_str(), "529.982.247-25 (Regular)");
        assert_eq!(r.identity.sex.as_str(), "Masculino");
        assert_eq!(r.identity.nationality.as_str(), "Brasileiro(a)");
        assert_eq!(r.identity.declared_income.as_str(), "R$ 1.200,00 (Faixa 2)");
        assert_eq!(r.tax_registry.status.as_str(), "REGULAR");
        assert_eq!(r.tax_registry.name_log.as_str(), "JOAO SILVA");
        assert_eq!(r.subject_cpf().as_deref(), Some("52998224725"));
    }

    #[test]
    fn tabular_sections() {
        let r = parse(SAMPLE);
        assert_eq!(r.career.education.as_str(), "ENSINO MEDIO");
        assert_eq!(r.career.professions.len(), 1);
        assert_eq!(r.career.professions[0].title.as_str(), "MOTORISTA");
        assert_eq!(r.career.rais.as_str(), "SEM VINCULO");

        assert_eq!(r.phones.len(), 2);
        assert_eq!(r.phones[0].number, "(11) 98765-4321");
        assert_eq!(r.phones[0].updated_at.as_str(), "02/02/2024");
        assert_eq!(r.phones[0].priority.as_str(), "1");
        assert_eq!(r.phones[0].note.as_deref(), Some("WhatsApp ativo"));
        assert_eq!(r.phones[1].updated_at.as_str(), "N/I");
        assert_eq!(r.phones[1].note, None);

        assert_eq!(r.carriers.len(), 1);
        assert_eq!(r.carriers[0].carrier.as_str(), "VIVO");

        assert_eq!(r.emails.len(), 1);
        assert_eq!(r.emails[0].date.as_str(), "03/03/2023");

        assert_eq!(r.addresses.len(), 1);
        assert_eq!(r.addresses[0].cep.as_str(), "01234-567");
    }

    #[test]
    fn relatives_skip_noise_and_bucket_bad_ids() {
        let r = parse(SAMPLE);
        assert_eq!(r.relatives.len(), 1);
        assert_eq!(r.relatives[0].name.as_str(), "MARIA DA SILVA");
        assert_eq!(r.relatives[0].cpf, TaxId::Unformatted("111.222.333".into()));
        assert_eq!(r.unformatted_ids, vec!["111.222.333".to_string()]);
    }

    #[test]
    fn profile_documents_flags_and_scores() {
        let r = parse(SAMPLE);
        assert_eq!(r.socio.social_class.as_str(), "CLASSE D");
        assert_eq!(r.documents.pis.as_str(), "123.45678.90-1");
        assert_eq!(r.documents.rg.as_str(), NOT_INFORMED);
        assert_eq!(r.credit_flags.purpose.as_str(), "Marketing Direto");
        assert_eq!(r.credit_flags.mobile_profile.as_str(), "SIM");
        // the scan stops at the first "...Internet" line
        assert_eq!(r.credit_flags.luxury_profile.as_str(), "NAO");
        assert_eq!(r.scores.csb8_value.as_str(), "420");
        assert_eq!(r.scores.csb8_label.as_str(), "Risco Muito Alto");
        assert_eq!(r.scores.csba_value.as_str(), NOT_INFORMED);
    }

    #[test]
    fn email_header_spellings_are_tried_in_order() {
        let r = parse("EMAILS\nana@example.org\nENDEREÇOS\n");
        assert_eq!(r.emails.len(), 1);
        assert_eq!(r.emails[0].email, "ana@example.org");
        assert_eq!(r.emails[0].date.as_str(), NOT_INFORMED);
    }

    #[test]
    fn malformed_identity_cpf_is_bucketed() {
        let r = parse("CPF\n123.45\n");
        assert_eq!(r.identity.cpf.as_str(), "123.45 (Regular)");
        assert_eq!(r.unformatted_ids, vec!["123.45".to_string()]);
        assert_eq!(r.meta.protocol.as_str(), "DT-CPF-12345");
        assert_eq!(r.subject_cpf(), None);
    }
}
