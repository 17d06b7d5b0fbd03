//! Entity Extractor: raw dossier text → scored candidate entities.
//!
//! Extraction is rule-based. Each entity kind has its own module with a
//! match pattern and validation. Every match is scored from the text window
//! around it by [`scoring::score`].
//!
//! Unreadable or empty input yields an empty [`Extraction`]; nothing in this
//! module returns an error.

pub mod address;
pub mod identifiers;
pub mod phone;
pub mod scoring;
pub mod vehicle;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::Candidate;
use crate::normalize::{collapse_whitespace, digits};

/// Name particles and generational suffixes that never count as surnames.
const NAME_PARTICLES: &[&str] = &[
    "DE", "DA", "DO", "DOS", "DAS", "E", "NETO", "JUNIOR", "FILHO", "SOBRINHO",
];

/// Longest justification snippet kept on a candidate, in chars.
const JUSTIFICATION_CHARS: usize = 120;

/// Context window sizes, in characters.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExtractionConfig {
    #[serde(default = "default_window_before")]
    pub window_before: usize,
    #[serde(default = "default_window_after")]
    pub window_after: usize,
    #[serde(default = "default_address_window")]
    pub address_window: usize,
    #[serde(default = "default_min_address_len")]
    pub min_address_len: usize,
}

fn default_window_before() -> usize {
    150
}

fn default_window_after() -> usize {
    200
}

fn default_address_window() -> usize {
    300
}

fn default_min_address_len() -> usize {
    10
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            window_before: default_window_before(),
            window_after: default_window_after(),
            address_window: default_address_window(),
            min_address_len: default_min_address_len(),
        }
    }
}

/// The person a dossier is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetName {
    /// Uppercased, whitespace-collapsed full name.
    pub full: String,
    /// Tokens longer than two chars, minus particles and suffixes.
    pub surnames: Vec<String>,
}

impl TargetName {
    pub fn new(name: &str) -> Self {
        let full = collapse_whitespace(&name.to_uppercase());
        let surnames = full
            .split_whitespace()
            .filter(|t| t.chars().count() > 2 && !NAME_PARTICLES.contains(t))
            .map(str::to_string)
            .collect();
        Self { full, surnames }
    }

    /// True when the full name occurs in `upper_window` (already uppercased).
    pub fn mentioned_in(&self, upper_window: &str) -> bool {
        !self.full.is_empty() && upper_window.contains(&self.full)
    }

    /// True when `name` shares at least one token with the surname set.
    pub fn shares_surname(&self, name: &str) -> bool {
        name.split_whitespace()
            .any(|token| self.surnames.iter().any(|s| s == token))
    }
}

/// Everything found in one text.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    pub phones: Vec<Candidate>,
    pub addresses: Vec<Candidate>,
    pub vehicles: Vec<Candidate>,
    pub identifiers: Vec<Candidate>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.phones.len() + self.addresses.len() + self.vehicles.len() + self.identifiers.len()
    }

    /// All candidates in a stable order: phones, addresses, plates, identifiers.
    pub fn into_candidates(self) -> Vec<Candidate> {
        let mut all = self.phones;
        all.extend(self.addresses);
        all.extend(self.vehicles);
        all.extend(self.identifiers);
        all
    }
}

/// Rule-based extractor bound to one target name.
#[derive(Debug, Clone)]
pub struct EntityExtractor {
    target: TargetName,
    config: ExtractionConfig,
}

impl EntityExtractor {
    pub fn new(target_name: &str) -> Self {
        Self::with_config(target_name, ExtractionConfig::default())
    }

    pub fn with_config(target_name: &str, config: ExtractionConfig) -> Self {
        Self {
            target: TargetName::new(target_name),
            config,
        }
    }

    pub fn target(&self) -> &TargetName {
        &self.target
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn extract_phones(&self, text: &str) -> Vec<Candidate> {
        phone::extract(self, text)
    }

    pub fn extract_addresses(&self, text: &str) -> Vec<Candidate> {
        address::extract(self, text)
    }

    pub fn extract_vehicles(&self, text: &str) -> Vec<Candidate> {
        vehicle::extract(self, text)
    }

    pub fn extract_identifiers(&self, text: &str) -> Vec<Candidate> {
        identifiers::extract(self, text)
    }

    /// Run every rule. Phone candidates whose digits equal an extracted CPF
    /// are dropped, since an unpunctuated CPF also looks like a mobile number.
    pub fn extract_all(&self, text: &str) -> Extraction {
        if text.trim().is_empty() {
            return Extraction::default();
        }
        let identifiers = self.extract_identifiers(text);
        let cpf_digits: Vec<String> = identifiers
            .iter()
            .filter(|c| c.kind == crate::models::EntityKind::Cpf)
            .map(|c| digits(&c.value))
            .collect();
        let phones = self
            .extract_phones(text)
            .into_iter()
            .filter(|p| !cpf_digits.contains(&digits(&p.value)))
            .collect();

        let extraction = Extraction {
            phones,
            addresses: self.extract_addresses(text),
            vehicles: self.extract_vehicles(text),
            identifiers,
        };
        debug!(
            phones = extraction.phones.len(),
            addresses = extraction.addresses.len(),
            vehicles = extraction.vehicles.len(),
            identifiers = extraction.identifiers.len(),
            "extraction finished"
        );
        extraction
    }
}

/// Slice of `text` spanning `before` chars ahead of `start` and `after`
/// chars past `end`. Offsets are byte offsets on char boundaries, as
/// returned by `regex`.
pub fn window(text: &str, start: usize, end: usize, before: usize, after: usize) -> &str {
    let from = if before == 0 {
        start
    } else {
        text[..start]
            .char_indices()
            .rev()
            .nth(before - 1)
            .map_or(0, |(i, _)| i)
    };
    let to = text[end..]
        .char_indices()
        .nth(after)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

/// Whitespace-collapsed, length-capped context snippet.
pub fn justification(window: &str) -> String {
    collapse_whitespace(window)
        .chars()
        .take(JUSTIFICATION_CHARS)
        .collect()
}
