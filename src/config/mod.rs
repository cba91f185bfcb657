#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::pipeline::{DETAILS_FILE, UNION_FILE};
use crate::core::{ConfigProvider, SourceDefinition};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use std::path::{Component, Path};
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = "../data";
pub const DEFAULT_ASSETS_DIR: &str = "../assets";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub const MAX_TIMEOUT_SECONDS: u64 = 3600;

pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetcherConfig {
    pub sources: Vec<SourceDefinition>,
    pub data_dir: String,
    pub assets_dir: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            sources: SourceDefinition::defaults(),
            data_dir: DEFAULT_DATA_DIR.to_string(),
            assets_dir: DEFAULT_ASSETS_DIR.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            user_agent: default_user_agent(),
        }
    }
}

impl FetcherConfig {
    pub fn with_sources(mut self, sources: Vec<SourceDefinition>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<String>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_assets_dir(mut self, assets_dir: impl Into<String>) -> Self {
        self.assets_dir = assets_dir.into();
        self
    }

    pub fn with_timeout_seconds(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    /// Whether list files and `details.json` end up in one directory.
    pub fn shares_output_dir(&self) -> bool {
        fn normalized(dir: &str) -> Vec<Component<'_>> {
            Path::new(dir)
                .components()
                .filter(|c| *c != Component::CurDir)
                .collect()
        }

        normalized(&self.data_dir) == normalized(&self.assets_dir)
    }

    /// File names the run writes next to the list files.
    fn reserved_file_names(&self) -> Vec<&'static str> {
        if self.shares_output_dir() {
            vec![UNION_FILE, DETAILS_FILE]
        } else {
            vec![UNION_FILE]
        }
    }
}

impl ConfigProvider for FetcherConfig {
    fn sources(&self) -> &[SourceDefinition] {
        &self.sources
    }

    fn data_dir(&self) -> &str {
        &self.data_dir
    }

    fn assets_dir(&self) -> &str {
        &self.assets_dir
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

impl Validate for FetcherConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("data_dir", &self.data_dir)?;
        validation::validate_path("assets_dir", &self.assets_dir)?;
        validation::validate_range("timeout_seconds", self.timeout_seconds, 1, MAX_TIMEOUT_SECONDS)?;

        if self.user_agent.trim().is_empty() {
            return Err(EtlError::ConfigValidationError {
                field: "user_agent".to_string(),
                message: "User agent cannot be empty".to_string(),
            });
        }

        if self.sources.is_empty() {
            return Err(EtlError::MissingConfigError {
                field: "sources".to_string(),
            });
        }

        let reserved = self.reserved_file_names();
        for (index, source) in self.sources.iter().enumerate() {
            let field = format!("sources[{}].name", index);
            validation::validate_list_name(&field, &source.name)?;
            if reserved.iter().any(|name| *name == source.file_name()) {
                return Err(EtlError::InvalidConfigValueError {
                    field,
                    value: source.name.clone(),
                    reason: format!("{} is written by the summary step", source.file_name()),
                });
            }
            validation::validate_url(&format!("sources[{}].url", index), &source.url)?;
        }

        validation::validate_unique_names("sources", self.sources.iter().map(|s| s.name.as_str()))
    }
}
