//! Cosmos DB error classification.

use serde::Deserialize;
use thiserror::Error;

use super::credential::CredentialError;

/// Text Cosmos DB puts in 401 responses when the account only accepts
/// Azure AD tokens.
pub const LOCAL_AUTH_DISABLED_MARKER: &str = "Local Authorization is disabled";

#[derive(Debug, Error)]
pub enum CosmosError {
    #[error("Invalid Cosmos DB endpoint: {0}")]
    InvalidUrl(String),

    #[error("Invalid Cosmos DB key: {0}")]
    InvalidKey(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Cosmos DB request failed: {0}")]
    Transport(#[from] ureq::Error),

    #[error("Cosmos DB returned HTTP {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
        substatus: Option<u32>,
    },

    #[error("Failed to encode or decode Cosmos DB payload: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to acquire Azure AD token: {0}")]
    Credential(#[from] CredentialError),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl CosmosError {
    /// Build a status error from a non-success response body
    #[inline]
    pub fn from_response(status: u16, substatus: Option<u32>, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => (parsed.code, parsed.message),
            Err(_) => (String::new(), body.to_string()),
        };

        Self::Status {
            status,
            code,
            message,
            substatus,
        }
    }

    #[inline]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    #[inline]
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// The account rejects shared-key auth and requires Azure AD.
    ///
    /// Keyed on the 401 status first; the message marker is a heuristic
    /// because Cosmos DB exposes no dedicated substatus for this case.
    #[inline]
    pub fn is_local_auth_disabled(&self) -> bool {
        match self {
            Self::Status {
                status: 401,
                message,
                ..
            } => message.contains(LOCAL_AUTH_DISABLED_MARKER),
            _ => false,
        }
    }
}
