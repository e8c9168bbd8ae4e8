
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_MAX_TOKENS: u32 = 5686;
pub const DEFAULT_PARTITION_KEY_PATH: &str = "/ProductID";
pub const DEFAULT_CATALOG_PATH: &str = "data/updated_product_catalog(in).csv";
pub const DEFAULT_CATALOG_ENCODING: &str = "windows-1252";

/// Environment variables that override values from the config file.
pub mod env_keys {
    pub const COMPLETION_ENDPOINT: &str = "gpt_endpoint";
    pub const COMPLETION_DEPLOYMENT: &str = "gpt_deployment";
    pub const COMPLETION_API_KEY: &str = "gpt_api_key";
    pub const COSMOS_ENDPOINT: &str = "COSMOS_ENDPOINT";
    pub const COSMOS_KEY: &str = "COSMOS_KEY";
    pub const DATABASE_NAME: &str = "DATABASE_NAME";
    pub const CONTAINER_NAME: &str = "CONTAINER_NAME";
    pub const CATALOG_CSV: &str = "CATALOG_CSV";
}

const MASK: &str = "********";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub cosmos: CosmosConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub deployment: String,
    pub api_key: String,
    pub api_version: String,
    pub prompt_path: PathBuf,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            deployment: String::new(),
            api_key: String::new(),
            api_version: DEFAULT_API_VERSION.to_string(),
            prompt_path: PathBuf::from("prompts/addToCartPrompt.txt"),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CosmosConfig {
    pub endpoint: String,
    pub key: Option<String>,
    pub database: String,
    pub container: String,
    pub partition_key_path: String,
}

impl Default for CosmosConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            key: None,
            database: String::new(),
            container: String::new(),
            partition_key_path: DEFAULT_PARTITION_KEY_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub catalog_path: PathBuf,
    pub encoding: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_CATALOG_PATH),
            encoding: DEFAULT_CATALOG_ENCODING.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    DirectoryError,
    #[error("Missing required setting: {0} must be provided")]
    Missing(&'static str),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid temperature: {0} (must be between 0 and 2)")]
    InvalidTemperature(f32),
    #[error("Invalid top_p: {0} (must be between 0 and 1)")]
    InvalidTopP(f32),
    #[error("Invalid penalty: {0} (must be between -2 and 2)")]
    InvalidPenalty(f32),
    #[error("Invalid max tokens: {0} (must be greater than 0)")]
    InvalidMaxTokens(u32),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid partition key path: {0} (must start with '/')")]
    InvalidPartitionKeyPath(String),
    #[error("Unknown catalog encoding: {0}")]
    UnknownEncoding(String),
    #[error("Failed to read prompt file {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Load configuration from `path`, or from the default location when no
    /// path is given, then apply process environment overrides.
    #[inline]
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(
                        "No config file at {}, using defaults",
                        default_path.display()
                    );
                    Self::default()
                }
            }
        };

        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    #[inline]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Directory holding `config.toml` when no explicit path is given
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("catalog-assist"))
            .ok_or(ConfigError::DirectoryError)
    }

    #[inline]
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Override settings with any non-empty values returned by `lookup`.
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(value) = get(env_keys::COMPLETION_ENDPOINT) {
            self.completion.endpoint = value;
        }
        if let Some(value) = get(env_keys::COMPLETION_DEPLOYMENT) {
            self.completion.deployment = value;
        }
        if let Some(value) = get(env_keys::COMPLETION_API_KEY) {
            self.completion.api_key = value;
        }
        if let Some(value) = get(env_keys::COSMOS_ENDPOINT) {
            self.cosmos.endpoint = value;
        }
        if let Some(value) = get(env_keys::COSMOS_KEY) {
            self.cosmos.key = Some(value);
        }
        if let Some(value) = get(env_keys::DATABASE_NAME) {
            self.cosmos.database = value;
        }
        if let Some(value) = get(env_keys::CONTAINER_NAME) {
            self.cosmos.container = value;
        }
        if let Some(value) = get(env_keys::CATALOG_CSV) {
            self.ingest.catalog_path = PathBuf::from(value);
        }
    }

    /// Copy of this configuration with secrets replaced, for display
    #[inline]
    pub fn masked(&self) -> Self {
        let mut config = self.clone();
        if !config.completion.api_key.is_empty() {
            config.completion.api_key = MASK.to_string();
        }
        if config.cosmos.key.is_some() {
            config.cosmos.key = Some(MASK.to_string());
        }
        config
    }

    #[inline]
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Missing(env_keys::COMPLETION_ENDPOINT));
        }
        Url::parse(&self.endpoint).map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;

        if self.deployment.trim().is_empty() {
            return Err(ConfigError::Missing(env_keys::COMPLETION_DEPLOYMENT));
        }

        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing(env_keys::COMPLETION_API_KEY));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::InvalidTemperature(self.temperature));
        }

        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(ConfigError::InvalidTopP(self.top_p));
        }

        for penalty in [self.frequency_penalty, self.presence_penalty] {
            if !(-2.0..=2.0).contains(&penalty) {
                return Err(ConfigError::InvalidPenalty(penalty));
            }
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::InvalidMaxTokens(self.max_tokens));
        }

        if !(1..=600).contains(&self.timeout_secs) {
            return Err(ConfigError::InvalidTimeout(self.timeout_secs));
        }

        Ok(())
    }

    /// Chat completions URL for the configured deployment
    pub fn chat_completions_url(&self) -> Result<Url, ConfigError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;
        url.set_query(None);

        // appended so a gateway path prefix on the endpoint is kept
        url.path_segments_mut()
            .map_err(|()| ConfigError::InvalidUrl(self.endpoint.clone()))?
            .pop_if_empty()
            .extend([
                "openai",
                "deployments",
                self.deployment.trim(),
                "chat",
                "completions",
            ]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

impl CosmosConfig {
    /// Checks the container target. The endpoint is checked when connecting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.endpoint.trim().is_empty() {
            Url::parse(&self.endpoint)
                .map_err(|_| ConfigError::InvalidUrl(self.endpoint.clone()))?;
        }

        if self.database.trim().is_empty() {
            return Err(ConfigError::Missing(env_keys::DATABASE_NAME));
        }

        if self.container.trim().is_empty() {
            return Err(ConfigError::Missing(env_keys::CONTAINER_NAME));
        }

        if !self.partition_key_path.starts_with('/') || self.partition_key_path.len() < 2 {
            return Err(ConfigError::InvalidPartitionKeyPath(
                self.partition_key_path.clone(),
            ));
        }

        Ok(())
    }
}

impl IngestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve_encoding()?;
        Ok(())
    }

    pub fn resolve_encoding(&self) -> Result<&'static encoding_rs::Encoding, ConfigError> {
        encoding_rs::Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnknownEncoding(self.encoding.clone()))
    }
}
