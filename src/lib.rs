use thiserror::Error;

pub type Result<T> = std::result::Result<T, AssistError>;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Completion error: {0}")]
    Completion(#[from] completion::CompletionError),

    #[error("Cosmos DB error: {0}")]
    Cosmos(#[from] cosmos::CosmosError),

    #[error("Connection error: {0}")]
    Connect(#[from] ingest::ConnectError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] ingest::CatalogError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod cart;
pub mod commands;
pub mod completion;
pub mod config;
pub mod cosmos;
pub mod ingest;
