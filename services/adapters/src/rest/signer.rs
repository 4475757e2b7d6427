//! HMAC-SHA256 signing for Woo stream auth and REST requests
//!
//! Three message shapes share one secret:
//! 1. Stream auth challenge: `"|" + timestamp`, hex digest
//! 2. Parameter signature: `k1=v1&k2=v2|timestamp`, base64 digest
//! 3. REST request: `normalized_query|timestamp` (or `|timestamp`), hex digest

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::config::WooCredentials;
use crate::{AdapterError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Signer bound to one API key pair
#[derive(Clone)]
pub struct Signer {
    api_key: String,
    secret: String,
}

impl Signer {
    pub fn new(api_key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret: secret.into(),
        }
    }

    pub fn from_credentials(credentials: &WooCredentials) -> Self {
        Self::new(&credentials.api_key, &credentials.secret)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    fn digest(&self, message: &str) -> Result<Vec<u8>> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| AdapterError::Internal(format!("HMAC key rejected: {}", e)))?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Signature for the stream auth frame
    pub fn sign_challenge(&self, timestamp_ms: u64) -> Result<String> {
        Ok(hex::encode(self.digest(&format!("|{}", timestamp_ms))?))
    }

    /// Base64 signature over `k=v` pairs in the given order
    pub fn sign_params(&self, params: &[(String, String)], timestamp_ms: u64) -> Result<String> {
        let joined = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        let digest = self.digest(&format!("{}|{}", joined, timestamp_ms))?;
        Ok(STANDARD.encode(digest))
    }

    /// Hex signature for the `x-api-signature` REST header
    pub fn sign_request(&self, normalized: &str, timestamp_ms: u64) -> Result<String> {
        let message = if normalized.is_empty() {
            format!("|{}", timestamp_ms)
        } else {
            format!("{}|{}", normalized, timestamp_ms)
        };
        Ok(hex::encode(self.digest(&message)?))
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signer")
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: u64 = 1639000000000;

    #[test]
    fn test_challenge_signature() {
        let signer = Signer::new("key", "secret");
        assert_eq!(
            signer.sign_challenge(TS).unwrap(),
            "c4c1b1f8802d8faf5c6536d3c78e505841047c96ec577d7652586067f80e0686"
        );
    }

    #[test]
    fn test_request_signature_without_params_matches_challenge() {
        let signer = Signer::new("key", "secret");
        assert_eq!(
            signer.sign_request("", TS).unwrap(),
            signer.sign_challenge(TS).unwrap()
        );
    }

    #[test]
    fn test_params_signature_is_base64() {
        let signer = Signer::new("key", "secret");
        let params = vec![
            ("symbol".to_string(), "SPOT_BTC_USDT".to_string()),
            ("side".to_string(), "BUY".to_string()),
        ];
        assert_eq!(
            signer.sign_params(&params, TS).unwrap(),
            "Aqy+OfzlT4Ab+d56NhWWDZrYWMSrLW5ovA9KLmr3JPY="
        );
        assert_eq!(
            signer
                .sign_request("symbol=SPOT_BTC_USDT&side=BUY", TS)
                .unwrap(),
            "02acbe39fce54f801bf9de7a3615960d9ad858c4ab2d6e68bc0f4a2e6af724f6"
        );
    }

    #[test]
    fn test_debug_hides_secret() {
        let signer = Signer::new("key", "very-secret");
        assert!(!format!("{:?}", signer).contains("very-secret"));
    }
}
