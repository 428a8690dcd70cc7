use std::collections::HashMap;

/// Source folder ID → destination folder ID.
///
/// Entries are final: once a source folder is mapped, later inserts for the
/// same ID are refused, so the mapping only ever grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderMapping {
    map: HashMap<String, String>,
}

impl FolderMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.map.get(source_id).map(String::as_str)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.map.contains_key(source_id)
    }

    /// Returns false, leaving the existing entry in place, if `source_id` is
    /// already mapped.
    pub fn insert(&mut self, source_id: &str, destination_id: &str) -> bool {
        if self.map.contains_key(source_id) {
            return false;
        }
        self.map
            .insert(source_id.to_string(), destination_id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(s, d)| (s.as_str(), d.as_str()))
    }
}
