//! Anchor lookup and the rule tables that drive section scanning.
//!
//! An anchor is the first line equal to, or ending with, a header label.
//! Single-value fields are described by [`FieldRule`] (value = the line after
//! the anchor); repeated rows by [`RowRule`] (header, skip, terminators,
//! consumption).

use crate::models::Field;

/// Read-only view over pre-split dossier lines.
#[derive(Debug, Clone, Copy)]
pub struct Lines<'a> {
    lines: &'a [String],
}

impl<'a> Lines<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        Self { lines }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&'a str> {
        self.lines.get(idx).map(String::as_str)
    }

    /// Line at `idx`, or `""` past the end.
    pub fn at(&self, idx: usize) -> &'a str {
        self.get(idx).unwrap_or("")
    }

    pub fn slice(&self, from: usize, to: usize) -> &'a [String] {
        let to = to.min(self.lines.len());
        let from = from.min(to);
        &self.lines[from..to]
    }

    /// First line at or after `start` that equals or ends with `label`.
    pub fn find(&self, label: &str, start: usize) -> Option<usize> {
        (start..self.lines.len()).find(|&i| {
            let line = self.lines[i].as_str();
            line == label || line.ends_with(label)
        })
    }

    /// Try each label in order; the first one found wins.
    pub fn find_any(&self, labels: &[&str], start: usize) -> Option<usize> {
        labels.iter().find_map(|label| self.find(label, start))
    }

    /// The line after the anchor, or the sentinel.
    pub fn value_after(&self, label: &str, start: usize) -> Field {
        self.find(label, start)
            .and_then(|idx| self.get(idx + 1))
            .map(Field::new)
            .unwrap_or_default()
    }

    /// Lines `from..to` joined by single spaces.
    pub fn join(&self, from: usize, to: usize) -> String {
        self.slice(from, to).join(" ")
    }
}

/// Sets one field of `T` from the line following `anchor`.
pub struct FieldRule<T> {
    pub anchor: &'static str,
    pub set: fn(&mut T, Field),
}

/// Fill `target` from a table of field rules, searching from `start`.
pub fn apply_fields<T>(lines: &Lines<'_>, start: usize, rules: &[FieldRule<T>], target: &mut T) {
    for rule in rules {
        (rule.set)(target, lines.value_after(rule.anchor, start));
    }
}

/// A tabular section of repeated rows.
#[derive(Debug, Clone, Copy)]
pub struct RowRule {
    /// Accepted header spellings, tried in order.
    pub headers: &'static [&'static str],
    /// Lines between the header and the first row (1 = the next line).
    pub skip: usize,
    /// Headers that close the section, searched after the header.
    pub terminators: &'static [&'static str],
    /// Lines consumed by a matching row.
    pub consume: usize,
}

impl RowRule {
    /// `(first row line, end exclusive)` or `None` when the header is absent.
    pub fn bounds(&self, lines: &Lines<'_>, start: usize) -> Option<(usize, usize)> {
        let header = lines.find_any(self.headers, start)?;
        let end = lines
            .find_any(self.terminators, header + 1)
            .unwrap_or(lines.len());
        Some((header + self.skip, end))
    }
}

/// Scan a tabular section. `row` is called at each cursor position; on
/// `Some` the cursor advances by `rule.consume`, otherwise by one.
pub fn scan_rows<R>(
    lines: &Lines<'_>,
    start: usize,
    rule: &RowRule,
    mut row: impl FnMut(&Lines<'_>, usize) -> Option<R>,
) -> Vec<R> {
    let Some((mut cursor, end)) = rule.bounds(lines, start) else {
        return Vec::new();
    };
    let mut rows = Vec::new();
    while cursor < end {
        match row(lines, cursor) {
            Some(r) => {
                rows.push(r);
                cursor += rule.consume.max(1);
            }
            None => cursor += 1,
        }
    }
    rows
}
