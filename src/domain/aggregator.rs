use crate::domain::model::{SummaryRecord, UnionRecord};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};

/// Per-run accumulation of list counts and the distinct entries seen so far.
///
/// One aggregator is built per run and handed to every fetch step; nothing is
/// carried over between runs.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    counts: BTreeMap<String, usize>,
    unique: HashSet<String>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successfully fetched list. A later call for the same name
    /// replaces its count; the entries stay in the unique set.
    pub fn record(&mut self, list_name: &str, entries: &[String]) {
        self.counts.insert(list_name.to_string(), entries.len());
        self.unique.extend(entries.iter().cloned());
    }

    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    pub fn total_unique(&self) -> usize {
        self.unique.len()
    }

    pub fn summary_at(&self, now: DateTime<Utc>) -> SummaryRecord {
        SummaryRecord {
            total_ips_per_list: self.counts.clone(),
            total_unique_ips: self.total_unique(),
            last_updated: format_timestamp(now),
        }
    }

    /// Materializes the unique set. Order follows set iteration and is not
    /// stable between runs.
    pub fn union_record(&self) -> UnionRecord {
        UnionRecord::new(self.unique.iter().cloned().collect())
    }
}

/// ISO-8601 UTC with microseconds and a trailing `Z`.
pub fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}
