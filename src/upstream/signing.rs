//! HMAC-SHA256 request signing for the diet service

use crate::error::UpstreamError;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`. Must be computed over the exact bytes sent.
pub fn sign_body(secret: &str, body: &[u8]) -> Result<String, UpstreamError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| UpstreamError::Signing(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a hex signature.
///
/// Receiving-side counterpart of `sign_body`. The gateway itself only signs;
/// this is kept public for the integration tests and for stub diet services
/// that need to check what the gateway sends.
pub fn verify_body(secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
