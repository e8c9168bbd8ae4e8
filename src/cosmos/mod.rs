// Cosmos DB module
// Minimal blocking client for the SQL API: auth signing, Azure AD credentials,
// database/container provisioning and document upserts

pub mod auth;
pub mod client;
pub mod credential;
pub mod errors;

pub use client::{
    AuthKind, ContainerClient, ContainerProperties, CosmosClient, DatabaseClient,
    DatabaseProperties, ItemSink, PartitionKeyDefinition,
};
pub use credential::{
    AccessToken, AzureIdentityCredential, CredentialError, StaticTokenCredential, TokenCredential,
};
pub use errors::{CosmosError, LOCAL_AUTH_DISABLED_MARKER};
