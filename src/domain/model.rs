use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named blocklist and where to download it from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDefinition {
    pub name: String,
    pub url: String,
}

impl SourceDefinition {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// The FireHOL lists fetched when no sources file is given, in fetch order.
    pub fn defaults() -> Vec<SourceDefinition> {
        [
            "firehol_level1",
            "firehol_level2",
            "firehol_level3",
            "firehol_anonymous",
            "firehol_webclient",
            "firehol_abusers_30d",
            "firehol_abusers_1d",
            "firehol_webserver",
        ]
        .into_iter()
        .map(|name| {
            SourceDefinition::new(
                name,
                format!("https://iplists.firehol.org/files/{}.netset", name),
            )
        })
        .collect()
    }

    pub fn file_name(&self) -> String {
        format!("{}.json", self.name)
    }
}

/// On-disk shape of both a per-list file and `all_threats.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRecord {
    #[serde(default)]
    pub ips: Vec<String>,
}

impl ListRecord {
    pub fn new(ips: Vec<String>) -> Self {
        Self { ips }
    }

    pub fn len(&self) -> usize {
        self.ips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ips.is_empty()
    }
}

/// Same shape as a list file, holding every distinct entry across all lists.
pub type UnionRecord = ListRecord;

/// Contents of `details.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub total_ips_per_list: BTreeMap<String, usize>,
    pub total_unique_ips: usize,
    pub last_updated: String,
}

/// What was on disk for a list before this run overwrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriorRecord {
    Missing,
    Unreadable { reason: String },
    Valid { count: usize },
}

impl PriorRecord {
    pub fn count(&self) -> usize {
        match self {
            PriorRecord::Valid { count } => *count,
            PriorRecord::Missing | PriorRecord::Unreadable { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountDelta {
    Added(usize),
    Removed(usize),
    Unchanged,
}

impl CountDelta {
    pub fn between(old_count: usize, new_count: usize) -> Self {
        if new_count > old_count {
            CountDelta::Added(new_count - old_count)
        } else if old_count > new_count {
            CountDelta::Removed(old_count - new_count)
        } else {
            CountDelta::Unchanged
        }
    }

    pub fn signed(&self) -> i64 {
        match *self {
            CountDelta::Added(n) => n as i64,
            CountDelta::Removed(n) => -(n as i64),
            CountDelta::Unchanged => 0,
        }
    }
}

impl std::fmt::Display for CountDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CountDelta::Added(n) => write!(f, "Added {} IPs", n),
            CountDelta::Removed(n) => write!(f, "Removed {} IPs", n),
            CountDelta::Unchanged => write!(f, "No change in IP count"),
        }
    }
}

/// Result of fetching and rewriting one list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    pub list_name: String,
    pub prior: PriorRecord,
    pub new_count: usize,
    pub delta: CountDelta,
}

impl FetchOutcome {
    pub fn new(list_name: impl Into<String>, prior: PriorRecord, new_count: usize) -> Self {
        let delta = CountDelta::between(prior.count(), new_count);
        Self {
            list_name: list_name.into(),
            prior,
            new_count,
            delta,
        }
    }

    pub fn old_count(&self) -> usize {
        self.prior.count()
    }
}

/// What the final summary step wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub summary: SummaryRecord,
    pub details_path: String,
    pub union_path: String,
}

/// A source that could not be fetched this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedSource {
    pub list_name: String,
    pub reason: String,
}

/// Everything one engine run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub updated: Vec<FetchOutcome>,
    pub failed: Vec<FailedSource>,
    pub summary: RunSummary,
}
