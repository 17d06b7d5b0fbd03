//! Address block reconstruction.
//!
//! Dossier exports lay each address out over several lines with the street on
//! top and a `Prioridade:` line at the bottom. How a block is stitched back
//! together is a pluggable [`AddressBlockRule`].

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::models::Field;

static CEP_HEAD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{5})-").unwrap());
static CEP_TAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{3})\s+\d{2}:\d{2}:\d{2}").unwrap());
static CEP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{5}-\d{3}").unwrap());
static CEP_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{5}-)\s*(\d{3})").unwrap());
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d{2}/\d{2}/\d{4}").unwrap());
static CITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-ZÇÃÉÍÓÚ]+/[A-Z]{2}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressEntry {
    /// First word of the street line (`RUA`, `AV`, ...).
    pub kind: Field,
    pub street: Field,
    pub city_state: Field,
    pub cep: Field,
    pub updated_at: Field,
    pub priority: Field,
}

/// Turns the raw lines of an address section into entries.
pub trait AddressBlockRule: Send + Sync {
    fn reconstruct(&self, block: &[String]) -> Vec<AddressEntry>;
}

/// Walk back from every `Prioridade:` line to the nearest preceding
/// `Bairro:` line. The city sits one line above it and the street two above.
/// Blocks without a `Bairro:` line are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityBackScan;

impl AddressBlockRule for PriorityBackScan {
    fn reconstruct(&self, block: &[String]) -> Vec<AddressEntry> {
        let mut entries = Vec::new();
        for (i, line) in block.iter().enumerate() {
            let Some(priority) = line.strip_prefix("Prioridade:") else {
                continue;
            };
            let Some(bairro_idx) = (0..i).rev().find(|&j| block[j].starts_with("Bairro:")) else {
                continue;
            };

            let bairro_line = block[bairro_idx].as_str();
            let city_line = bairro_idx
                .checked_sub(1)
                .map_or("", |j| block[j].as_str());
            let street_line = bairro_idx
                .checked_sub(2)
                .map_or("", |j| block[j].as_str());

            entries.push(AddressEntry {
                kind: Field::new(street_line.split_whitespace().next().unwrap_or("")),
                street: Field::new(street_line),
                city_state: Field::new(
                    CITY_RE
                        .find(city_line)
                        .map_or(city_line, |m| m.as_str()),
                ),
                cep: Field::new(extract_cep(city_line, bairro_line)),
                updated_at: Field::new(
                    DATE_RE
                        .find(&format!("{city_line} {bairro_line}"))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                ),
                priority: Field::new(priority),
            });
        }
        entries
    }
}

/// The CEP is often split across the city and bairro lines, with the
/// suffix printed just before a timestamp.
fn extract_cep(city_line: &str, bairro_line: &str) -> String {
    if let (Some(head), Some(tail)) = (
        CEP_HEAD_RE.captures(city_line),
        CEP_TAIL_RE.captures(bairro_line),
    ) {
        return format!("{}-{}", &head[1], &tail[1]);
    }
    let joined = format!("{city_line} {bairro_line}");
    if let Some(m) = CEP_RE.find(&joined) {
        return m.as_str().to_string();
    }
    CEP_SPLIT_RE
        .captures(&joined)
        .map(|c| format!("{}{}", &c[1], &c[2]))
        .unwrap_or_default()
}
