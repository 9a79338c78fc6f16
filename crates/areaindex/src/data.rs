//! In-memory area index.

use std::collections::HashMap;

use crate::entry::AreaIndexEntry;

/// Entries in index order, plus id and name-key lookups into them.
///
/// Ids are unique. Name keys are not: when two areas normalize to the same
/// key, the one inserted last wins.
#[derive(Debug, Clone, Default)]
pub struct AreaIndexData {
    entries: Vec<AreaIndexEntry>,
    by_id: HashMap<String, usize>,
    by_name: HashMap<String, String>,
}

impl AreaIndexData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = AreaIndexEntry>) -> Self {
        let mut data = Self::new();
        for entry in entries {
            data.upsert(entry);
        }
        data
    }

    /// Inserts a new entry at the end, or replaces an existing one in place.
    /// Returns true when the id was not indexed before.
    pub fn upsert(&mut self, entry: AreaIndexEntry) -> bool {
        let name_key = entry.name_key();
        let id = entry.id.clone();

        let inserted = match self.by_id.get(&id) {
            Some(&position) => {
                let previous_key = self.entries[position].name_key();
                if previous_key != name_key
                    && self.by_name.get(&previous_key).is_some_and(|owner| *owner == id)
                {
                    self.by_name.remove(&previous_key);
                }
                self.entries[position] = entry;
                false
            }
            None => {
                self.by_id.insert(id.clone(), self.entries.len());
                self.entries.push(entry);
                true
            }
        };

        if !name_key.is_empty() {
            self.by_name.insert(name_key, id);
        }
        inserted
    }

    pub fn get(&self, id: &str) -> Option<&AreaIndexEntry> {
        self.by_id.get(id).map(|&position| &self.entries[position])
    }

    pub fn id_for_name_key(&self, name_key: &str) -> Option<&str> {
        self.by_name.get(name_key).map(String::as_str)
    }

    pub fn entries(&self) -> &[AreaIndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Order-independent comparison of the indexed entries.
    pub fn same_entries(&self, other: &AreaIndexData) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|entry| other.get(&entry.id) == Some(entry))
    }
}
