pub mod etl;
pub mod parser;
pub mod pipeline;

pub use crate::domain::aggregator::Aggregator;
pub use crate::domain::model::{
    CountDelta, FailedSource, FetchOutcome, FetchReport, ListRecord, PriorRecord, RunSummary,
    SourceDefinition, SummaryRecord, UnionRecord,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
