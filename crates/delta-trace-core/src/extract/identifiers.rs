//! Tax identifiers (CPF, CNPJ) and e-mail addresses.
//!
//! Only punctuated CPFs are matched: a bare 11-digit run is far more often a
//! mobile number. CPFs made of one repeated digit are dropped; CPFs failing
//! the check digits are kept at the lowest tier.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::scoring::{score, Signals};
use super::{justification, window, EntityExtractor};
use crate::models::{Candidate, EntityKind};
use crate::normalize::{cpf_check_digits_valid, dedup_key, digits};

static CPF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}\.\d{3}\.\d{3}-\d{2}\b").unwrap());
static CNPJ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}\b").unwrap());
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());

fn all_same_digit(value: &str) -> bool {
    let d = digits(value);
    d.chars().all(|c| Some(c) == d.chars().next())
}

pub(crate) fn extract(ex: &EntityExtractor, text: &str) -> Vec<Candidate> {
    let cfg = ex.config();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    let rules: [(EntityKind, &Regex); 3] = [
        (EntityKind::Cpf, &*CPF_RE),
        (EntityKind::Cnpj, &*CNPJ_RE),
        (EntityKind::Email, &*EMAIL_RE),
    ];

    for (kind, re) in rules {
        for m in re.find_iter(text) {
            let value = m.as_str();
            if kind == EntityKind::Cpf && all_same_digit(value) {
                continue;
            }
            if !seen.insert(dedup_key(kind, value)) {
                continue;
            }
            let ctx = window(text, m.start(), m.end(), cfg.window_before, cfg.window_after);
            let signals = Signals {
                mentions_target: ex.target().mentioned_in(&ctx.to_uppercase()),
                failed_validation: kind == EntityKind::Cpf && !cpf_check_digits_valid(value),
                ..Signals::default()
            };
            let (tier, class) = score(kind, signals);
            let stored = if kind == EntityKind::Email {
                value.to_lowercase()
            } else {
                value.to_string()
            };
            let mut candidate = Candidate::new(kind, stored, tier, class);
            if signals.mentions_target && !signals.failed_validation {
                candidate.owner = Some(ex.target().full.clone());
            }
            candidate.justification = justification(ctx);
            out.push(candidate);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceTier, SourceClass};

    #[test]
    fn cpf_check_digits_drive_tier() {
        let ex = EntityExtractor::new("NINGUEM");
        let found = ex.extract_identifiers("a 529.982.247-25 b 529.982.247-26 c 111.111.111-11");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].tier, ConfidenceTier::Baseline);
        assert_eq!(found[0].classification, SourceClass::Investigar);
        assert_eq!(found[1].tier, ConfidenceTier::Low);
        assert_eq!(found[1].confidence, 30);
    }

    #[test]
    fn cnpj_and_email() {
        let ex = EntityExtractor::new("Maria Souza");
        let found =
            ex.extract_identifiers("MARIA SOUZA Maria.Souza@Example.com empresa 11.222.333/0001-81");
        let kinds: Vec<_> = found.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![EntityKind::Cnpj, EntityKind::Email]);
        assert_eq!(found[1].value, "maria.souza@example.com");
        assert!(found.iter().all(|c| c.tier == ConfidenceTier::Confirmed));
    }

    #[test]
    fn bare_digit_runs_are_not_cpfs() {
        let ex = EntityExtractor::new("NINGUEM");
        assert!(ex.extract_identifiers("52998224725").is_empty());
    }
}
