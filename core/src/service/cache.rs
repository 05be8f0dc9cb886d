use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::model::aggregate::AggregatedSeries;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub package: Option<String>,
}

impl CacheKey {
    pub fn new(start: NaiveDate, end: NaiveDate, package: Option<&str>) -> Self {
        Self {
            start,
            end,
            package: package.map(str::to_string),
        }
    }
}

struct Entry {
    version: u64,
    series: AggregatedSeries,
}

/// Memoised aggregation results, dropped wholesale on every write.
#[derive(Default)]
pub struct AggregationCache {
    version: u64,
    entries: HashMap<CacheKey, Entry>,
}

impl AggregationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&AggregatedSeries> {
        let hit = self
            .entries
            .get(key)
            .filter(|e| e.version == self.version)
            .map(|e| &e.series);
        debug!(hit = hit.is_some(), start = %key.start, end = %key.end, "aggregation cache lookup");
        hit
    }

    pub fn insert(&mut self, key: CacheKey, series: AggregatedSeries) {
        self.entries.insert(
            key,
            Entry {
                version: self.version,
                series,
            },
        );
    }

    pub fn invalidate(&mut self) {
        self.version += 1;
        self.entries.clear();
        debug!(version = self.version, "aggregation cache invalidated");
    }
}
