use crate::config::FetcherConfig;
use crate::core::SourceDefinition;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional sources file. Every section may be omitted; an empty `sources`
/// list keeps the built-in FireHOL lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub output: Option<OutputConfig>,
    pub http: Option<HttpConfig>,
    #[serde(default)]
    pub sources: Vec<SourceDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub data_dir: Option<String>,
    pub assets_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

impl TomlConfig {
    /// Loads a sources file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_vars(content, |name| std::env::var(name).ok())?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Layers the file's settings over `base`.
    pub fn apply_to(self, mut base: FetcherConfig) -> FetcherConfig {
        if !self.sources.is_empty() {
            base.sources = self.sources;
        }

        if let Some(output) = self.output {
            if let Some(data_dir) = output.data_dir {
                base.data_dir = data_dir;
            }
            if let Some(assets_dir) = output.assets_dir {
                base.assets_dir = assets_dir;
            }
        }

        if let Some(http) = self.http {
            if let Some(timeout) = http.timeout_seconds {
                base.timeout_seconds = timeout;
            }
            if let Some(user_agent) = http.user_agent {
                base.user_agent = user_agent;
            }
        }

        base
    }
}

/// Replaces `${VAR}` with `lookup(VAR)`; names the lookup does not know are left as written.
fn substitute_vars<F>(content: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
        message: format!("Invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    Ok(result.into_owned())
}
