//! Brazilian phone numbers.
//!
//! Accepted shapes: bare 10/11 digit runs, `DD DDDD(D)-DDDD` and
//! `(DD) DDDD(D)-DDDD`. Numbers are deduplicated by their digit-only form;
//! the first occurrence provides the context window.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::scoring::{score, Signals};
use super::{justification, window, EntityExtractor};
use crate::models::{Candidate, EntityKind};
use crate::normalize::{digits, format_phone};

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\(\d{2}\) ?|\b\d{2} ?|\b)\d{4,5}[- ]?\d{4}\b").unwrap()
});
static KIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(?:MÃE|MAE|PAI)\b").unwrap());

/// Digit-only form of an acceptable phone number.
///
/// Rejects 8-digit numbers (no area code), anything not 10 or 11 digits,
/// a leading `0` (trunk prefix, not an area code) and 11-digit numbers whose
/// third digit is not the mobile `9`.
pub fn valid_phone_digits(raw: &str) -> Option<String> {
    let d = digits(raw);
    if d.len() != 10 && d.len() != 11 {
        return None;
    }
    if d.starts_with('0') {
        return None;
    }
    if d.len() == 11 && d.as_bytes()[2] != b'9' {
        return None;
    }
    Some(d)
}

pub(crate) fn extract(ex: &EntityExtractor, text: &str) -> Vec<Candidate> {
    let cfg = ex.config();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for m in PHONE_RE.find_iter(text) {
        let Some(d) = valid_phone_digits(m.as_str()) else {
            continue;
        };
        if !seen.insert(d.clone()) {
            continue;
        }

        let ctx = window(text, m.start(), m.end(), cfg.window_before, cfg.window_after);
        let upper = ctx.to_uppercase();
        let signals = Signals {
            mentions_target: ex.target().mentioned_in(&upper),
            mentions_kin: KIN_RE.is_match(&upper),
            ..Signals::default()
        };
        let (tier, class) = score(EntityKind::Phone, signals);

        let mut candidate = Candidate::new(EntityKind::Phone, format_phone(&d), tier, class);
        if signals.mentions_target {
            candidate.owner = Some(ex.target().full.clone());
        }
        candidate.justification = justification(ctx);
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceTier, SourceClass};

    #[test]
    fn validation_rules() {
        assert_eq!(valid_phone_digits("11987654321").as_deref(), Some("11987654321"));
        assert_eq!(valid_phone_digits("11287654321"), None);
        assert_eq!(valid_phone_digits("98765432"), None);
        assert_eq!(valid_phone_digits("01987654321"), None);
        assert_eq!(valid_phone_digits("0134567890"), None);
        assert_eq!(valid_phone_digits("1134567890").as_deref(), Some("1134567890"));
    }

    #[test]
    fn formatted_and_bare_forms_dedup() {
        let ex = EntityExtractor::new("NINGUEM");
        let phones = ex.extract_phones("tel 11987654321 ou (11) 98765-4321");
        assert_eq!(phones.len(), 1);
        assert_eq!(phones[0].value, "(11) 98765-4321");
        assert_eq!(phones[0].tier, ConfidenceTier::Baseline);
        assert_eq!(phones[0].classification, SourceClass::Terceiro);
    }

    #[test]
    fn invalid_mobile_is_rejected() {
        let ex = EntityExtractor::new("NINGUEM");
        assert!(ex.extract_phones("tel 11287654321").is_empty());
    }

    #[test]
    fn target_in_window_confirms_ownership() {
        let ex = EntityExtractor::new("João da Silva");
        let phones = ex.extract_phones("JOÃO DA SILVA - celular (11) 98765-4321");
        assert_eq!(phones[0].tier, ConfidenceTier::Confirmed);
        assert_eq!(phones[0].confidence, 100);
        assert_eq!(phones[0].owner.as_deref(), Some("JOÃO DA SILVA"));
        assert!(phones[0].justification.contains("98765-4321"));
    }

    #[test]
    fn kinship_word_marks_family() {
        let ex = EntityExtractor::new("João da Silva");
        let phones = ex.extract_phones("Telefone da mãe: (21) 3456-7890");
        assert_eq!(phones[0].tier, ConfidenceTier::Family);
        assert_eq!(phones[0].classification, SourceClass::VinculoFamiliar);
        assert_eq!(phones[0].value, "(21) 3456-7890");
    }
}
