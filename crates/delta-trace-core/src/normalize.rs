//! Value normalization: digit stripping, Brazilian tax-ID grouping, phone
//! display formatting and the natural dedup keys used for graph nodes.

use serde::Serialize;

use crate::models::EntityKind;

/// Keep only ASCII digits.
pub fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Uppercase and drop everything that is not a letter or digit.
pub fn alphanumeric_upper(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_uppercase)
        .collect()
}

/// `"RISCO ALTO"` → `"Risco Alto"`.
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// A Brazilian tax identifier after normalization.
///
/// Identifiers with exactly 11 digits are grouped as a CPF
/// (`000.000.000-00`) and 14 digits as a CNPJ (`00.000.000/0000-00`).
/// Anything else is kept verbatim in [`TaxId::Unformatted`] so a malformed
/// value never breaks a parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TaxId {
    Cpf(String),
    Cnpj(String),
    Unformatted(String),
}

impl TaxId {
    pub fn parse(raw: &str) -> Self {
        let d = digits(raw);
        match d.len() {
            11 => TaxId::Cpf(format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])),
            14 => TaxId::Cnpj(format!(
                "{}.{}.{}/{}-{}",
                &d[0..2],
                &d[2..5],
                &d[5..8],
                &d[8..12],
                &d[12..14]
            )),
            _ => TaxId::Unformatted(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TaxId::Cpf(s) | TaxId::Cnpj(s) | TaxId::Unformatted(s) => s,
        }
    }

    pub fn is_formatted(&self) -> bool {
        !matches!(self, TaxId::Unformatted(_))
    }
}

/// Validate the two CPF check digits (mod-11). Repeated-digit CPFs such as
/// `111.111.111-11` satisfy the arithmetic but are rejected.
pub fn cpf_check_digits_valid(value: &str) -> bool {
    let d: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 11 || d.iter().all(|x| *x == d[0]) {
        return false;
    }
    let check = |len: usize| -> u32 {
        let sum: u32 = d[..len]
            .iter()
            .enumerate()
            .map(|(i, x)| x * (len as u32 + 1 - i as u32))
            .sum();
        match (sum * 10) % 11 {
            10 => 0,
            r => r,
        }
    };
    check(9) == d[9] && check(10) == d[10]
}

/// Canonical display form for a 10- or 11-digit phone number.
pub fn format_phone(phone_digits: &str) -> String {
    match phone_digits.len() {
        11 => format!(
            "({}) {}-{}",
            &phone_digits[0..2],
            &phone_digits[2..7],
            &phone_digits[7..11]
        ),
        10 => format!(
            "({}) {}-{}",
            &phone_digits[0..2],
            &phone_digits[2..6],
            &phone_digits[6..10]
        ),
        _ => phone_digits.to_string(),
    }
}

/// Normalized value used to decide whether two mentions are the same node.
///
/// Punctuation and whitespace are stripped so that differently formatted
/// strings collapse to one value. E-mail addresses only lose whitespace and
/// case, because dots and plus signs are significant there.
pub fn normalized_value(kind: EntityKind, value: &str) -> String {
    match kind {
        EntityKind::Phone | EntityKind::Cpf | EntityKind::Cnpj => digits(value),
        EntityKind::Email => value
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect(),
        EntityKind::Address | EntityKind::Vehicle => alphanumeric_upper(value),
    }
}

/// Dedup key stored on entity nodes: `"<TYPE>:<normalized value>"`.
pub fn dedup_key(kind: EntityKind, value: &str) -> String {
    format!("{}:{}", kind.tag(), normalized_value(kind, value))
}
