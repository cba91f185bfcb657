use crate::config::toml_config::TomlConfig;
use crate::config::FetcherConfig;
use crate::utils::error::Result;
use clap::Parser;

/// Every flag is optional: a bare invocation fetches the built-in lists into
/// `../data` and `../assets`.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "firehol-fetcher")]
#[command(about = "Download FireHOL IP blocklists and convert them to JSON")]
pub struct CliConfig {
    /// TOML file with sources and output settings
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory for per-list files and all_threats.json
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Directory for details.json
    #[arg(long)]
    pub assets_dir: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Log CPU and memory usage after each list
    #[arg(long)]
    pub monitor: bool,
}

impl CliConfig {
    /// Defaults, then the sources file, then explicit flags.
    pub fn resolve(&self) -> Result<FetcherConfig> {
        let mut config = FetcherConfig::default();

        if let Some(path) = &self.config {
            tracing::info!("📁 Loading sources from: {}", path);
            config = TomlConfig::from_file(path)?.apply_to(config);
        }

        if let Some(data_dir) = &self.data_dir {
            config = config.with_data_dir(data_dir.as_str());
        }
        if let Some(assets_dir) = &self.assets_dir {
            config = config.with_assets_dir(assets_dir.as_str());
        }
        if let Some(timeout) = self.timeout_secs {
            config = config.with_timeout_seconds(timeout);
        }

        Ok(config)
    }
}
