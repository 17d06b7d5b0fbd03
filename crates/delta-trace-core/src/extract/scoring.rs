//! The confidence scoring function.
//!
//! Every candidate is scored from a handful of boolean context signals
//! gathered around the match. The tier decides the numeric confidence (see
//! [`ConfidenceTier`]) and the classification decides who the entity is
//! attributed to.
//!
//! | Kind | Target in window | Otherwise |
//! |------|------------------|-----------|
//! | phone | Confirmed / Pessoal | kinship word → Family / Vínculo Familiar; else Baseline / Terceiro |
//! | address | Confirmed / Pessoal | family HQ → Family / Vínculo Familiar; else Baseline / Investigar |
//! | plate | Plate / Veículo | Plate / Veículo |
//! | CPF, CNPJ, e-mail | Confirmed / Pessoal | Baseline / Investigar |
//!
//! A CPF failing its check digits is always Low / Investigar.

use crate::models::{ConfidenceTier, EntityKind, SourceClass};

/// Context observed around one match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    /// The full target name occurs in the window.
    pub mentions_target: bool,
    /// A kinship word (`MÃE`, `PAI`) occurs in the window.
    pub mentions_kin: bool,
    /// Two or more surname-sharing names around an address.
    pub family_hq: bool,
    /// The value is well-formed but fails validation (CPF check digits).
    pub failed_validation: bool,
}

pub fn score(kind: EntityKind, signals: Signals) -> (ConfidenceTier, SourceClass) {
    use ConfidenceTier::*;

    if signals.failed_validation {
        return (Low, SourceClass::Investigar);
    }
    match kind {
        EntityKind::Vehicle => (Plate, SourceClass::Veiculo),
        _ if signals.mentions_target => (Confirmed, SourceClass::Pessoal),
        EntityKind::Phone if signals.mentions_kin => (Family, SourceClass::VinculoFamiliar),
        EntityKind::Phone => (Baseline, SourceClass::Terceiro),
        EntityKind::Address if signals.family_hq => (Family, SourceClass::VinculoFamiliar),
        EntityKind::Address | EntityKind::Cpf | EntityKind::Cnpj | EntityKind::Email => {
            (Baseline, SourceClass::Investigar)
        }
    }
}
