//! Vehicle plates, legacy (`ABC-1234`) and Mercosul (`ABC1D23`).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use super::scoring::{score, Signals};
use super::{justification, window, EntityExtractor};
use crate::models::{Candidate, EntityKind};
use crate::normalize::alphanumeric_upper;

static PLATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}-?[0-9][A-Z0-9][0-9]{2}\b").unwrap());

pub(crate) fn extract(ex: &EntityExtractor, text: &str) -> Vec<Candidate> {
    let cfg = ex.config();
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for m in PLATE_RE.find_iter(text) {
        let plate = alphanumeric_upper(m.as_str());
        if !seen.insert(plate.clone()) {
            continue;
        }
        let ctx = window(text, m.start(), m.end(), cfg.window_before, cfg.window_after);
        let mentions_target = ex.target().mentioned_in(&ctx.to_uppercase());
        let (tier, class) = score(
            EntityKind::Vehicle,
            Signals {
                mentions_target,
                ..Signals::default()
            },
        );
        let mut candidate = Candidate::new(EntityKind::Vehicle, plate, tier, class);
        if mentions_target {
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
    fn legacy_and_mercosul_plates() {
        let ex = EntityExtractor::new("NINGUEM");
        let plates = ex.extract_vehicles("Veiculo ABC-1234 e BRA2E19, de novo ABC1234");
        let values: Vec<_> = plates.iter().map(|p| p.value.as_str()).collect();
        assert_eq!(values, vec!["ABC1234", "BRA2E19"]);
        assert!(plates
            .iter()
            .all(|p| p.tier == ConfidenceTier::Plate && p.classification == SourceClass::Veiculo));
        assert_eq!(plates[0].confidence, 90);
    }

    #[test]
    fn lowercase_and_short_runs_are_not_plates() {
        let ex = EntityExtractor::new("NINGUEM");
        assert!(ex.extract_vehicles("abc-1234 AB-1234 ABCD12345").is_empty());
    }
}
