pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::storage::LocalStorage;
pub use config::FetcherConfig;
pub use core::{etl::EtlEngine, pipeline::BlocklistPipeline};
pub use domain::aggregator::Aggregator;
pub use domain::model::{FetchReport, ListRecord, SourceDefinition, SummaryRecord};
pub use utils::error::{EtlError, Result};
