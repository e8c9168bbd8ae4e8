//! Azure AD token acquisition for identity-based Cosmos DB access.
//!
//! [`AzureIdentityCredential`] wraps the `azure_identity` default chain
//! (environment client secret, managed identity, Azure CLI) behind the
//! blocking [`TokenCredential`] seam the Cosmos client signs requests with.

#[cfg(test)]
mod tests;

use azure_core::credentials::TokenCredential as AzureTokenCredential;
use azure_identity::DefaultAzureCredential;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::{Builder, Runtime};
use tracing::info;
use url::Url;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{credential} failed: {message}")]
    Request {
        credential: &'static str,
        message: String,
    },
}

impl CredentialError {
    fn request(credential: &'static str, message: impl fmt::Display) -> Self {
        Self::Request {
            credential,
            message: message.to_string(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expires_on: DateTime<Utc>,
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("expires_on", &self.expires_on)
            .finish_non_exhaustive()
    }
}

impl AccessToken {
    #[inline]
    pub fn new(token: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_on,
        }
    }

    /// True when the token expires within `margin` of `now`
    #[inline]
    pub fn expires_within(&self, now: DateTime<Utc>, margin: ChronoDuration) -> bool {
        self.expires_on - now <= margin
    }
}

/// Source of Azure AD bearer tokens
pub trait TokenCredential: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

/// Scope for the data plane of the account at `endpoint`
#[inline]
pub fn cosmos_scope(endpoint: &Url) -> String {
    format!("{}/.default", endpoint.origin().ascii_serialization())
}

/// A token supplied by the caller, e.g. from an external login step
#[derive(Debug, Clone)]
pub struct StaticTokenCredential {
    token: AccessToken,
}

impl StaticTokenCredential {
    #[inline]
    pub fn new(token: AccessToken) -> Self {
        Self { token }
    }
}

impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "StaticTokenCredential"
    }

    fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        Ok(self.token.clone())
    }
}

/// Blocking adapter over an `azure_identity` credential.
///
/// Owns a current-thread runtime; must not be called from inside an async
/// context.
pub struct AzureIdentityCredential {
    inner: Arc<dyn AzureTokenCredential>,
    runtime: Runtime,
}

impl fmt::Debug for AzureIdentityCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureIdentityCredential")
            .finish_non_exhaustive()
    }
}

impl AzureIdentityCredential {
    const NAME: &'static str = "AzureIdentityCredential";

    #[inline]
    pub fn new(inner: Arc<dyn AzureTokenCredential>) -> Result<Self, CredentialError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| CredentialError::request(Self::NAME, e))?;
        Ok(Self { inner, runtime })
    }

    /// Environment client secret, managed identity, then the Azure CLI
    #[inline]
    pub fn from_default_chain() -> Result<Self, CredentialError> {
        let inner =
            DefaultAzureCredential::new().map_err(|e| CredentialError::request(Self::NAME, e))?;
        Self::new(inner)
    }
}

impl TokenCredential for AzureIdentityCredential {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let acquired = self
            .runtime
            .block_on(self.inner.get_token(&[scope]))
            .map_err(|e| CredentialError::request(Self::NAME, e))?;

        let expires_on = expiry_from_unix(acquired.expires_on.unix_timestamp())
            .ok_or_else(|| CredentialError::request(Self::NAME, "token has an invalid expiry"))?;

        info!("Acquired Azure AD token expiring at {}", expires_on);
        Ok(AccessToken::new(acquired.token.secret(), expires_on))
    }
}

fn expiry_from_unix(seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(seconds, 0)
}
