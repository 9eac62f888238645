//! Identifier table: one record per distinct identifier spelling.

use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierRecord {
    pub index: usize,
    pub name: String,
    /// Unset until a declaration tags it; later tags overwrite earlier ones.
    pub type_tag: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    records: Vec<IdentifierRecord>,
    by_name: HashMap<String, usize>,
}

impl IdentifierTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `name`, creating its record on first sighting.
    pub fn intern(&mut self, name: &str) -> usize {
        if let Some(&index) = self.by_name.get(name) {
            return index;
        }
        let index = self.records.len();
        self.records.push(IdentifierRecord {
            index,
            name: name.to_owned(),
            type_tag: None,
        });
        self.by_name.insert(name.to_owned(), index);
        index
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Returns `false` when no record exists at `index`.
    pub fn set_type(&mut self, index: usize, type_tag: &str) -> bool {
        match self.records.get_mut(index) {
            Some(record) => {
                record.type_tag = Some(type_tag.to_owned());
                true
            }
            None => false,
        }
    }

    pub fn get_type(&self, index: usize) -> Option<&str> {
        self.records.get(index)?.type_tag.as_deref()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.records.get(index).map(|r| r.name.as_str())
    }

    pub fn get(&self, index: usize) -> Option<&IdentifierRecord> {
        self.records.get(index)
    }

    pub fn records(&self) -> &[IdentifierRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let mut table = IdentifierTable::new();
        assert_eq!(table.intern("x"), 0);
        assert_eq!(table.intern("y"), 1);
        assert_eq!(table.intern("x"), 0);
        assert_eq!(table.len(), 2);
        assert_eq!(table.name(1), Some("y"));
    }

    #[test]
    fn type_tag_last_write_wins() {
        let mut table = IdentifierTable::new();
        let x = table.intern("x");
        assert_eq!(table.get_type(x), None);
        assert!(table.set_type(x, "integer"));
        assert!(table.set_type(x, "real"));
        assert_eq!(table.get_type(x), Some("real"));
        assert!(!table.set_type(7, "real"));
    }
}
