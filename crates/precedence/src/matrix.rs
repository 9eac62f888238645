//! Precedence matrix: one relation per ordered pair of terminals.

use gramex_core::{TerminalCode, TerminalPack};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Relation {
    None,
    Higher,
    Equal,
    Lower,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Relation::None => "NONE",
            Relation::Higher => "HIGHER",
            Relation::Equal => "EQUAL",
            Relation::Lower => "LOWER",
        };
        f.write_str(text)
    }
}

/// A pair whose relation was overwritten with a different one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub left: String,
    pub right: String,
    pub previous: Relation,
    pub replaced_by: Relation,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' and '{}' are both {} and {}",
            self.left, self.right, self.previous, self.replaced_by
        )
    }
}

/// One cell of the matrix, for listings and JSON output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub left: String,
    pub relation: Relation,
    pub right: String,
}

/// Finished relation table. Immutable once built.
#[derive(Debug, Clone)]
pub struct PrecedenceMatrix {
    labels: Vec<String>,
    index: HashMap<TerminalCode, usize>,
    cells: Vec<Relation>,
    conflicts: Vec<Conflict>,
}

impl PrecedenceMatrix {
    /// All-NONE matrix over every pack terminal plus the identifier and
    /// literal pseudo-terminals.
    pub(crate) fn empty(pack: &TerminalPack) -> Self {
        let codes = pack.all_codes();
        let labels = codes
            .iter()
            .map(|&code| pack.find_text(code).unwrap_or_default().to_owned())
            .collect();
        let index = codes.iter().enumerate().map(|(i, &code)| (code, i)).collect();
        PrecedenceMatrix {
            labels,
            index,
            cells: vec![Relation::None; codes.len() * codes.len()],
            conflicts: Vec::new(),
        }
    }

    /// Store a relation, last write wins. A changed non-NONE cell is
    /// recorded and returned as a conflict.
    pub(crate) fn set(&mut self, left: TerminalCode, right: TerminalCode, relation: Relation) -> Option<Conflict> {
        let (Some(&x), Some(&y)) = (self.index.get(&left), self.index.get(&right)) else {
            return None;
        };
        let cell = x * self.labels.len() + y;
        let previous = self.cells[cell];
        self.cells[cell] = relation;
        if previous == Relation::None || previous == relation {
            return None;
        }
        let conflict = Conflict {
            left: self.labels[x].clone(),
            right: self.labels[y].clone(),
            previous,
            replaced_by: relation,
        };
        self.conflicts.push(conflict.clone());
        Some(conflict)
    }

    /// Relation between two codes; NONE for codes outside the matrix.
    pub fn get(&self, left: TerminalCode, right: TerminalCode) -> Relation {
        match (self.index.get(&left), self.index.get(&right)) {
            (Some(&x), Some(&y)) => self.cells[x * self.labels.len() + y],
            _ => Relation::None,
        }
    }

    /// Relation between two terminals by display text.
    pub fn relation(&self, left: &str, right: &str) -> Option<Relation> {
        let x = self.labels.iter().position(|l| l == left)?;
        let y = self.labels.iter().position(|l| l == right)?;
        Some(self.cells[x * self.labels.len() + y])
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn size(&self) -> usize {
        self.labels.len()
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    /// Every ordered pair, sorted by left then right display text.
    pub fn entries(&self) -> Vec<Entry> {
        let n = self.labels.len();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| self.labels[a].cmp(&self.labels[b]));
        let mut entries = Vec::with_capacity(n * n);
        for &x in &order {
            for &y in &order {
                entries.push(Entry {
                    left: self.labels[x].clone(),
                    relation: self.cells[x * n + y],
                    right: self.labels[y].clone(),
                });
            }
        }
        entries
    }

    /// Diagnostic listing, one `"<x> <RELATION> <y>"` line per pair.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for entry in self.entries() {
            out.push_str(&format!("{} {} {}\n", entry.left, entry.relation, entry.right));
        }
        out
    }

    /// Only the pairs with a relation other than NONE.
    pub fn related(&self) -> Vec<Entry> {
        self.entries()
            .into_iter()
            .filter(|e| e.relation != Relation::None)
            .collect()
    }

    pub fn to_json_value(&self) -> serde_json::Value {
        serde_json::json!({
            "terminals": self.labels,
            "relations": self.related(),
            "conflicts": self.conflicts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack() -> TerminalPack {
        TerminalPack::builder().spaced_all(&["+", "*"]).build()
    }

    #[test]
    fn empty_matrix_covers_pseudo_terminals() {
        let matrix = PrecedenceMatrix::empty(&pack());
        assert_eq!(matrix.labels(), ["+", "*", "<identifier>", "<literal>"]);
        assert_eq!(matrix.get(0, 3), Relation::None);
        assert_eq!(matrix.get(0, 99), Relation::None);
    }

    #[test]
    fn set_records_conflicts() {
        let mut matrix = PrecedenceMatrix::empty(&pack());
        assert_eq!(matrix.set(0, 1, Relation::Lower), None);
        assert_eq!(matrix.set(0, 1, Relation::Lower), None);
        let conflict = matrix.set(0, 1, Relation::Higher).unwrap();
        assert_eq!(conflict.previous, Relation::Lower);
        assert_eq!(matrix.get(0, 1), Relation::Higher);
        assert_eq!(matrix.conflicts().len(), 1);
    }

    #[test]
    fn dump_is_sorted_and_complete() {
        let mut matrix = PrecedenceMatrix::empty(&pack());
        matrix.set(2, 0, Relation::Higher);
        let dump = matrix.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 16);
        assert_eq!(lines[0], "* NONE *");
        assert!(lines.contains(&"<identifier> HIGHER +"));
        let mut sorted = lines.clone();
        sorted.sort();
        assert_eq!(lines[..4], sorted[..4]);
    }
}
