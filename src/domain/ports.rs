use crate::domain::aggregator::Aggregator;
use crate::domain::model::{FetchOutcome, RunSummary, SourceDefinition};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn sources(&self) -> &[SourceDefinition];
    fn data_dir(&self) -> &str;
    fn assets_dir(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn user_agent(&self) -> &str;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn sources(&self) -> &[SourceDefinition];
    /// Downloads the raw list body.
    async fn extract(&self, source: &SourceDefinition) -> Result<String>;
    /// Turns a list body into its entries.
    fn transform(&self, body: &str) -> Vec<String>;
    /// Rewrites the list file and folds the entries into the aggregator.
    async fn load(
        &self,
        source: &SourceDefinition,
        entries: Vec<String>,
        aggregator: &mut Aggregator,
    ) -> Result<FetchOutcome>;
    /// Writes the summary and union files once every source was attempted.
    async fn finalize(&self, aggregator: &Aggregator) -> Result<RunSummary>;
}
