// Configuration management module
// TOML settings file plus environment overrides

pub mod settings;

pub use settings::{CompletionConfig, Config, ConfigError, CosmosConfig, IngestConfig, env_keys};
