#[cfg(test)]
mod tests;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;

use super::CosmosError;

type HmacSha256 = Hmac<Sha256>;

/// Shared-key signer for the Cosmos DB REST API
#[derive(Clone)]
pub struct MasterKey {
    key: Vec<u8>,
}

impl std::fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterKey").finish_non_exhaustive()
    }
}

impl MasterKey {
    /// Decode an account key as shown in the Azure portal (base64).
    #[inline]
    pub fn from_base64(key: &str) -> Result<Self, CosmosError> {
        let key = STANDARD
            .decode(key.trim())
            .map_err(|e| CosmosError::InvalidKey(e.to_string()))?;
        if key.is_empty() {
            return Err(CosmosError::InvalidKey("key is empty".to_string()));
        }
        Ok(Self { key })
    }

    /// Base64 HMAC-SHA256 over the canonical request string.
    #[inline]
    pub fn signature(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, CosmosError> {
        let payload = format!(
            "{}\n{}\n{}\n{}\n\n",
            verb.to_lowercase(),
            resource_type.to_lowercase(),
            resource_link,
            date.to_lowercase()
        );

        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| CosmosError::InvalidKey(e.to_string()))?;
        mac.update(payload.as_bytes());

        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    #[inline]
    pub fn authorization(
        &self,
        verb: &str,
        resource_type: &str,
        resource_link: &str,
        date: &str,
    ) -> Result<String, CosmosError> {
        let signature = self.signature(verb, resource_type, resource_link, date)?;
        Ok(encode_authorization("master", &signature))
    }
}

/// Authorization header value for an Azure AD bearer token
#[inline]
pub fn aad_authorization(token: &str) -> String {
    encode_authorization("aad", token)
}

fn encode_authorization(kind: &str, signature: &str) -> String {
    let raw = format!("type={}&ver=1.0&sig={}", kind, signature);
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// RFC 1123 timestamp for the `x-ms-date` header
#[inline]
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
