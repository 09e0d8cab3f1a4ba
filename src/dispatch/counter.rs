//! Internal dispatch counts.

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Number of internal dispatches per requested URI.
///
/// Counts only grow. They are diagnostic and never gate a dispatch.
#[derive(Debug, Default)]
pub struct CallCounter {
    calls: DashMap<String, u64>,
}

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one call to `uri` and return the new total.
    pub fn increment(&self, uri: &str) -> u64 {
        let mut count = self.calls.entry(uri.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn get(&self, uri: &str) -> u64 {
        self.calls.get(uri).map_or(0, |count| *count)
    }

    /// All counts, ordered by URI.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.calls
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}
