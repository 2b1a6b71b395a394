//! Session-lifetime search result cache.

use std::collections::HashMap;

use skycast_weather::LocationCandidate;

/// Results keyed by trimmed query. Entries are never evicted.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: HashMap<String, Vec<LocationCandidate>>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &str) -> Option<Vec<LocationCandidate>> {
        self.entries.get(query).cloned()
    }

    pub fn put(&mut self, query: impl Into<String>, results: Vec<LocationCandidate>) {
        self.entries.insert(query.into(), results);
    }

    pub fn contains(&self, query: &str) -> bool {
        self.entries.contains_key(query)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
