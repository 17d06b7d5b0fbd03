//! Street addresses and the family-HQ heuristic.
//!
//! An address is a street prefix, free text, a comma and a house number.
//! Around each match the extractor collects uppercase name sequences; when
//! two or more distinct names share a surname with the target the address is
//! flagged as a likely family headquarters.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use super::scoring::{score, Signals};
use super::{justification, window, EntityExtractor, TargetName};
use crate::models::{Candidate, EntityKind, Household};

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:RUA|AVENIDA|AV|ALAMEDA|TRAVESSA|RODOVIA|ESTRADA|PRAÇA)\.?\s+[^,\n]+,\s*\d+[^,\n]*",
    )
    .unwrap()
});
static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\p{Lu}{2,}(?:[ \t]+\p{Lu}{2,})+\b").unwrap());

/// Report boilerplate that looks like a name.
const NAME_DENYLIST: &[&str] = &[
    "REGISTRO PRINCIPAL",
    "DATA DE VINCULO",
    "ENDERECO VINCULADO",
    "TELEFONE MÓVEL",
];

const STREET_PREFIXES: &[&str] = &[
    "RUA", "AVENIDA", "AV", "ALAMEDA", "TRAVESSA", "RODOVIA", "ESTRADA", "PRAÇA",
];

/// Distinct person-like names in an uppercased window.
pub fn names_in(upper_window: &str) -> BTreeSet<String> {
    NAME_RE
        .find_iter(upper_window)
        .map(|m| m.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !NAME_DENYLIST.iter().any(|deny| name.contains(deny)))
        .filter(|name| {
            let first = name.split(' ').next().unwrap_or("");
            !STREET_PREFIXES.contains(&first.trim_end_matches('.'))
        })
        .collect()
}

/// Count surname-sharing names around an address.
pub fn household(target: &TargetName, upper_window: &str) -> Household {
    let associated_names: Vec<String> = names_in(upper_window).into_iter().collect();
    let match_count = associated_names
        .iter()
        .filter(|name| target.shares_surname(name))
        .count();
    Household {
        associated_names,
        match_count,
        is_family_hq: match_count >= 2,
    }
}

pub(crate) fn extract(ex: &EntityExtractor, text: &str) -> Vec<Candidate> {
    let cfg = ex.config();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for m in ADDRESS_RE.find_iter(text) {
        let full = m.as_str().trim().to_uppercase();
        if full.chars().count() < cfg.min_address_len || !seen.insert(full.clone()) {
            continue;
        }

        let ctx = window(text, m.start(), m.end(), cfg.address_window, cfg.address_window);
        let upper = ctx.to_uppercase();
        let household = household(ex.target(), &upper);
        let signals = Signals {
            mentions_target: ex.target().mentioned_in(&upper),
            family_hq: household.is_family_hq,
            ..Signals::default()
        };
        let (tier, class) = score(EntityKind::Address, signals);

        let mut candidate = Candidate::new(EntityKind::Address, full, tier, class);
        if signals.mentions_target {
            candidate.owner = Some(ex.target().full.clone());
        }
        candidate.justification = justification(window(
            text,
            m.start(),
            m.end(),
            cfg.window_before,
            cfg.window_after,
        ));
        candidate.household = Some(household);
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceTier, SourceClass};

    #[test]
    fn two_surname_matches_make_family_hq() {
        let target = TargetName::new("JOÃO DA SILVA");
        let h = household(&target, "RUA DAS FLORES, 123\nMARIA DA SILVA\nPEDRO SILVA\n");
        assert_eq!(h.match_count, 2);
        assert!(h.is_family_hq);
        assert!(!h.associated_names.iter().any(|n| n.starts_with("RUA")));
    }

    #[test]
    fn one_surname_match_is_not_hq() {
        let target = TargetName::new("JOÃO DA SILVA");
        let h = household(&target, "MARIA DA SILVA\nCARLOS PEREIRA\n");
        assert_eq!(h.match_count, 1);
        assert!(!h.is_family_hq);
    }

    #[test]
    fn boilerplate_is_denied() {
        let names = names_in("REGISTRO PRINCIPAL\nDATA DE VINCULO SILVA\nANA SILVA");
        assert_eq!(names.into_iter().collect::<Vec<_>>(), vec!["ANA SILVA"]);
    }

    #[test]
    fn short_and_duplicate_matches_are_dropped() {
        let ex = EntityExtractor::new("NINGUEM");
        let found = ex.extract_addresses("Rua das Flores, 123\nRUA DAS FLORES, 123\nAV X, 1");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "RUA DAS FLORES, 123");
        assert_eq!(found[0].tier, ConfidenceTier::Baseline);
        assert_eq!(found[0].classification, SourceClass::Investigar);
    }

    #[test]
    fn family_hq_address_scores_family() {
        let ex = EntityExtractor::new("João da Silva");
        let found = ex.extract_addresses("AV PAULISTA, 1000 apto 5\nMARIA DA SILVA\nPEDRO SILVA");
        assert_eq!(found.len(), 1);
        assert!(found[0].is_family_hq());
        assert_eq!(found[0].tier, ConfidenceTier::Family);
        assert_eq!(found[0].confidence, 75);
    }
}
