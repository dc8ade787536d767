// Third Party
use hmac::{Hmac, Mac};
use sha1::Sha1;

// Local
use crate::error::DeliveryError;

type HmacSha1 = Hmac<Sha1>;

/// Scheme tag prefixed to the hex digest in the signature header.
pub const SIGNATURE_PREFIX: &str = "sha1=";

/// Header carrying the payload signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature";

/// Computes the HMAC-SHA1 of `payload` keyed by `secret`, formatted as `sha1=<lowercase hex>`.
pub fn generate_signature(payload: &[u8], secret: &str) -> Result<String, DeliveryError> {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .map_err(|e| DeliveryError::Sign(e.to_string()))?;
    mac.update(payload);
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Receiver-side check of a signature header against the exact request body.
pub fn verify_signature(payload: &[u8], secret: &str, signature: &str) -> bool {
    let Some(digest) = signature
        .strip_prefix(SIGNATURE_PREFIX)
        .and_then(|hex_digest| hex::decode(hex_digest).ok())
    else {
        return false;
    };
    let Ok(mut mac) = HmacSha1::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(payload);
    mac.verify_slice(&digest).is_ok()
}
