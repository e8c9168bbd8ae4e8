
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::cosmos::{CosmosClient, CosmosError, TokenCredential};

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("COSMOS_ENDPOINT must be provided")]
    MissingEndpoint,
    #[error("Invalid Cosmos DB endpoint: {0}")]
    InvalidEndpoint(#[source] CosmosError),
    #[error(
        "Cosmos DB requires Azure AD authentication. Local key-based authentication is disabled. Please run 'az login' to authenticate."
    )]
    IdentityRequired(#[source] CosmosError),
    #[error("Endpoint+key authentication to Cosmos DB failed")]
    KeyAuthFailed(#[source] CosmosError),
    #[error(
        "Failed to authenticate to Cosmos DB using Azure AD credentials and no valid COSMOS_KEY was provided"
    )]
    NoWorkingCredential(#[source] CosmosError),
}

/// Connect to a Cosmos DB account, preferring Azure AD and falling back to
/// the shared key.
///
/// Each attempt is validated with a `list_databases` probe. When the account
/// reports that local (key) authorization is disabled the key is never tried.
#[inline]
pub fn get_cosmos_client(
    endpoint: &str,
    key: Option<&str>,
    credential: Arc<dyn TokenCredential>,
) -> Result<CosmosClient, ConnectError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConnectError::MissingEndpoint);
    }

    info!("Attempting to authenticate to Cosmos DB using Azure AD credentials...");
    let identity_error = match try_identity(endpoint, credential) {
        Ok(client) => {
            info!("Authenticated to Cosmos DB with Azure AD credentials");
            return Ok(client);
        }
        Err(CosmosError::InvalidUrl(message)) => {
            return Err(ConnectError::InvalidEndpoint(CosmosError::InvalidUrl(message)));
        }
        Err(identity_error) => identity_error,
    };

    warn!("Azure AD authentication failed: {}", identity_error);
    if identity_error.is_local_auth_disabled() {
        return Err(identity_required(identity_error));
    }

    let Some(key) = key.filter(|key| !key.is_empty()) else {
        return Err(ConnectError::NoWorkingCredential(identity_error));
    };

    info!("Falling back to endpoint + key authentication for Cosmos DB...");
    match try_key(endpoint, key) {
        Ok(client) => {
            info!("Authenticated to Cosmos DB with endpoint+key");
            Ok(client)
        }
        Err(key_error) if key_error.is_local_auth_disabled() => Err(identity_required(key_error)),
        Err(key_error) => {
            error!("Endpoint+key authentication failed: {}", key_error);
            Err(ConnectError::KeyAuthFailed(key_error))
        }
    }
}

fn try_identity(
    endpoint: &str,
    credential: Arc<dyn TokenCredential>,
) -> Result<CosmosClient, CosmosError> {
    let client = CosmosClient::with_credential(endpoint, credential)?;
    client.probe()?;
    Ok(client)
}

fn try_key(endpoint: &str, key: &str) -> Result<CosmosClient, CosmosError> {
    let client = CosmosClient::with_key(endpoint, key)?;
    client.probe()?;
    Ok(client)
}

fn identity_required(source: CosmosError) -> ConnectError {
    error!("Local Authorization is disabled on this Cosmos DB account.");
    error!("You must authenticate using Azure AD credentials.");
    error!("Please ensure you are logged in: Run 'az login' in your terminal.");
    ConnectError::IdentityRequired(source)
}
