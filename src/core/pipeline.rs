use crate::core::parser::parse_entries;
use crate::core::{
    Aggregator, ConfigProvider, FetchOutcome, ListRecord, Pipeline, PriorRecord, RunSummary,
    SourceDefinition, Storage,
};
use crate::utils::error::{EtlError, Result};
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::path::Path;

pub const DETAILS_FILE: &str = "details.json";
pub const UNION_FILE: &str = "all_threats.json";

/// Downloads blocklists over HTTP and keeps their JSON files in `Storage`.
pub struct BlocklistPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    client: Client,
}

impl<S: Storage, C: ConfigProvider> BlocklistPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()?;

        Ok(Self {
            storage,
            config,
            client,
        })
    }

    pub fn list_path(&self, source: &SourceDefinition) -> String {
        join(self.config.data_dir(), &source.file_name())
    }

    pub fn union_path(&self) -> String {
        join(self.config.data_dir(), UNION_FILE)
    }

    pub fn details_path(&self) -> String {
        join(self.config.assets_dir(), DETAILS_FILE)
    }

    /// Classifies whatever is currently stored for a list. Only used to report
    /// the count delta, so a broken file is never an error.
    pub async fn read_prior(&self, path: &str) -> PriorRecord {
        let data = match self.storage.read_file(path).await {
            Ok(data) => data,
            Err(EtlError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return PriorRecord::Missing;
            }
            Err(e) => {
                return PriorRecord::Unreadable {
                    reason: e.to_string(),
                }
            }
        };

        match serde_json::from_slice::<ListRecord>(&data) {
            Ok(record) => PriorRecord::Valid {
                count: record.len(),
            },
            Err(e) => PriorRecord::Unreadable {
                reason: e.to_string(),
            },
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for BlocklistPipeline<S, C> {
    fn sources(&self) -> &[SourceDefinition] {
        self.config.sources()
    }

    async fn extract(&self, source: &SourceDefinition) -> Result<String> {
        tracing::debug!("Requesting {} from {}", source.name, source.url);
        let response = self.client.get(&source.url).send().await?;

        let status = response.status();
        tracing::debug!("{} responded with {}", source.url, status);

        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                url: source.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }

    fn transform(&self, body: &str) -> Vec<String> {
        parse_entries(body)
    }

    async fn load(
        &self,
        source: &SourceDefinition,
        entries: Vec<String>,
        aggregator: &mut Aggregator,
    ) -> Result<FetchOutcome> {
        let path = self.list_path(source);

        let prior = self.read_prior(&path).await;
        if let PriorRecord::Unreadable { reason } = &prior {
            tracing::warn!("Error reading existing file {}, will create new file: {}", path, reason);
            println!("Error reading existing file {}, will create new file", path);
        }

        let record = ListRecord::new(entries);
        self.storage.write_file(&path, &to_json_pretty(&record)?).await?;
        tracing::debug!("Wrote {} entries to {}", record.len(), path);

        aggregator.record(&source.name, &record.ips);

        Ok(FetchOutcome::new(source.name.clone(), prior, record.len()))
    }

    async fn finalize(&self, aggregator: &Aggregator) -> Result<RunSummary> {
        let summary = aggregator.summary_at(Utc::now());
        let details_path = self.details_path();
        self.storage
            .write_file(&details_path, &to_json_pretty(&summary)?)
            .await?;

        let union_path = self.union_path();
        let union = aggregator.union_record();
        self.storage
            .write_file(&union_path, &to_json_pretty(&union)?)
            .await?;

        Ok(RunSummary {
            summary,
            details_path,
            union_path,
        })
    }
}

fn join(dir: &str, file: &str) -> String {
    Path::new(dir).join(file).to_string_lossy().into_owned()
}

/// Pretty JSON with four-space indentation.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CountDelta, SummaryRecord};
    use httpmock::prelude::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
        denied_reads: Arc<Mutex<HashSet<String>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
                denied_reads: Arc::new(Mutex::new(HashSet::new())),
            }
        }

        async fn deny_reads(&self, path: &str) {
            self.denied_reads.lock().await.insert(path.to_string());
        }

        async fn put_file(&self, path: &str, data: &[u8]) {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            if self.denied_reads.lock().await.contains(path) {
                return Err(EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    format!("Permission denied: {}", path),
                )));
            }

            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        sources: Vec<SourceDefinition>,
    }

    impl MockConfig {
        fn new(sources: Vec<SourceDefinition>) -> Self {
            Self { sources }
        }
    }

    impl ConfigProvider for MockConfig {
        fn sources(&self) -> &[SourceDefinition] {
            &self.sources
        }

        fn data_dir(&self) -> &str {
            "data"
        }

        fn assets_dir(&self) -> &str {
            "assets"
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn user_agent(&self) -> &str {
            "firehol-fetcher-test"
        }
    }

    fn pipeline_for(
        storage: MockStorage,
        sources: Vec<SourceDefinition>,
    ) -> BlocklistPipeline<MockStorage, MockConfig> {
        BlocklistPipeline::new(storage, MockConfig::new(sources)).unwrap()
    }

    fn level1() -> SourceDefinition {
        SourceDefinition::new("firehol_level1", "http://unused.invalid/level1")
    }

    fn entries(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_extract_returns_body() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/firehol_level1.netset")
                .header("user-agent", "firehol-fetcher-test");
            then.status(200)
                .header("Content-Type", "text/plain")
                .body("# header\n1.2.3.0/24\n");
        });

        let source = SourceDefinition::new("firehol_level1", server.url("/firehol_level1.netset"));
        let pipeline = pipeline_for(MockStorage::new(), vec![source.clone()]);

        let body = pipeline.extract(&source).await.unwrap();

        api_mock.assert();
        assert_eq!(body, "# header\n1.2.3.0/24\n");
    }

    #[tokio::test]
    async fn test_extract_non_success_status() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/gone.netset");
            then.status(404);
        });

        let source = SourceDefinition::new("gone", server.url("/gone.netset"));
        let pipeline = pipeline_for(MockStorage::new(), vec![source.clone()]);

        let err = pipeline.extract(&source).await.unwrap_err();

        api_mock.assert();
        assert!(err.is_source_local());
        match err {
            EtlError::HttpStatusError { status, url } => {
                assert_eq!(status, 404);
                assert!(url.ends_with("/gone.netset"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_extract_connection_failure() {
        let source = SourceDefinition::new("unreachable", "http://127.0.0.1:1/list.netset");
        let pipeline = pipeline_for(MockStorage::new(), vec![source.clone()]);

        let err = pipeline.extract(&source).await.unwrap_err();

        assert!(matches!(err, EtlError::ApiError(_)));
        assert!(err.is_source_local());
    }

    #[tokio::test]
    async fn test_load_without_prior_file() {
        let storage = MockStorage::new();
        let pipeline = pipeline_for(storage.clone(), vec![level1()]);
        let mut aggregator = Aggregator::new();

        let parsed = pipeline.transform("1.2.3.0/24\n# comment\n\n5.6.7.8");
        let outcome = pipeline
            .load(&level1(), parsed, &mut aggregator)
            .await
            .unwrap();

        assert_eq!(outcome.prior, PriorRecord::Missing);
        assert_eq!(outcome.new_count, 2);
        assert_eq!(outcome.delta, CountDelta::Added(2));

        let written = storage.get_file("data/firehol_level1.json").await.unwrap();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "{\n    \"ips\": [\n        \"1.2.3.0/24\",\n        \"5.6.7.8\"\n    ]\n}"
        );
        assert_eq!(aggregator.counts().get("firehol_level1"), Some(&2));
        assert_eq!(aggregator.total_unique(), 2);
    }

    #[tokio::test]
    async fn test_load_with_valid_prior_file() {
        let storage = MockStorage::new();
        storage
            .put_file(
                "data/firehol_level1.json",
                br#"{"ips": ["1.1.1.1", "2.2.2.2", "3.3.3.3"]}"#,
            )
            .await;
        let pipeline = pipeline_for(storage.clone(), vec![level1()]);
        let mut aggregator = Aggregator::new();

        let outcome = pipeline
            .load(&level1(), entries(&["1.1.1.1"]), &mut aggregator)
            .await
            .unwrap();

        assert_eq!(outcome.prior, PriorRecord::Valid { count: 3 });
        assert_eq!(outcome.old_count(), 3);
        assert_eq!(outcome.delta, CountDelta::Removed(2));

        let written = storage.get_file("data/firehol_level1.json").await.unwrap();
        let record: ListRecord = serde_json::from_slice(&written).unwrap();
        assert_eq!(record.ips, entries(&["1.1.1.1"]));
    }

    #[tokio::test]
    async fn test_load_unchanged_list_reports_no_delta() {
        let storage = MockStorage::new();
        let pipeline = pipeline_for(storage.clone(), vec![level1()]);

        let first = pipeline
            .load(&level1(), entries(&["9.9.9.9"]), &mut Aggregator::new())
            .await
            .unwrap();
        let before = storage.get_file("data/firehol_level1.json").await.unwrap();

        let second = pipeline
            .load(&level1(), entries(&["9.9.9.9"]), &mut Aggregator::new())
            .await
            .unwrap();
        let after = storage.get_file("data/firehol_level1.json").await.unwrap();

        assert_eq!(first.delta, CountDelta::Added(1));
        assert_eq!(second.delta, CountDelta::Unchanged);
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_load_with_corrupt_prior_file() {
        let storage = MockStorage::new();
        storage
            .put_file("data/firehol_level1.json", b"{\"ips\": [\"1.1.1.1\",")
            .await;
        let pipeline = pipeline_for(storage.clone(), vec![level1()]);
        let mut aggregator = Aggregator::new();

        let outcome = pipeline
            .load(&level1(), entries(&["4.4.4.4", "5.5.5.5"]), &mut aggregator)
            .await
            .unwrap();

        assert!(matches!(outcome.prior, PriorRecord::Unreadable { .. }));
        assert_eq!(outcome.old_count(), 0);
        assert_eq!(outcome.delta, CountDelta::Added(2));

        let written = storage.get_file("data/firehol_level1.json").await.unwrap();
        let record: ListRecord = serde_json::from_slice(&written).unwrap();
        assert_eq!(record.len(), 2);
    }

    #[tokio::test]
    async fn test_load_with_unreadable_prior_file() {
        let storage = MockStorage::new();
        storage
            .put_file("data/firehol_level1.json", br#"{"ips": ["1.1.1.1"]}"#)
            .await;
        storage.deny_reads("data/firehol_level1.json").await;
        let pipeline = pipeline_for(storage.clone(), vec![level1()]);
        let mut aggregator = Aggregator::new();

        let outcome = pipeline
            .load(&level1(), entries(&["6.6.6.6", "7.7.7.7"]), &mut aggregator)
            .await
            .unwrap();

        match &outcome.prior {
            PriorRecord::Unreadable { reason } => assert!(reason.contains("Permission denied")),
            other => panic!("expected Unreadable, got {:?}", other),
        }
        assert_eq!(outcome.old_count(), 0);
        assert_eq!(outcome.delta, CountDelta::Added(2));

        let written = storage.get_file("data/firehol_level1.json").await.unwrap();
        let record: ListRecord = serde_json::from_slice(&written).unwrap();
        assert_eq!(record.ips, entries(&["6.6.6.6", "7.7.7.7"]));
        assert_eq!(aggregator.counts().get("firehol_level1"), Some(&2));
    }

    #[tokio::test]
    async fn test_finalize_writes_summary_and_union() {
        let storage = MockStorage::new();
        let pipeline = pipeline_for(storage.clone(), vec![]);
        let mut aggregator = Aggregator::new();
        aggregator.record("list_a", &entries(&["1.1.1.1"]));
        aggregator.record("list_b", &entries(&["1.1.1.1", "2.2.2.2"]));

        let run = pipeline.finalize(&aggregator).await.unwrap();

        assert_eq!(run.details_path, "assets/details.json");
        assert_eq!(run.union_path, "data/all_threats.json");
        assert_eq!(run.summary.total_unique_ips, 2);

        let details = storage.get_file("assets/details.json").await.unwrap();
        let details: SummaryRecord = serde_json::from_slice(&details).unwrap();
        assert_eq!(details, run.summary);
        assert_eq!(details.total_ips_per_list.get("list_b"), Some(&2));
        assert!(details.last_updated.ends_with('Z'));

        let union = storage.get_file("data/all_threats.json").await.unwrap();
        let mut union: ListRecord = serde_json::from_slice(&union).unwrap();
        union.ips.sort();
        assert_eq!(union.ips, entries(&["1.1.1.1", "2.2.2.2"]));
    }

    #[tokio::test]
    async fn test_read_prior_classifies_missing_file() {
        let pipeline = pipeline_for(MockStorage::new(), vec![]);
        assert_eq!(
            pipeline.read_prior("data/nothing.json").await,
            PriorRecord::Missing
        );
    }

    #[test]
    fn test_to_json_pretty_empty_list() {
        let json = to_json_pretty(&ListRecord::default()).unwrap();
        assert_eq!(String::from_utf8(json).unwrap(), "{\n    \"ips\": []\n}");
    }
}
