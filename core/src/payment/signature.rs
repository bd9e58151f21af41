// paygate/src/payment/signature.rs

use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::error::{PaygateError, PaygateResult};

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 over the raw request body, hex encoded.
///
/// The provided signature may carry a `sha256=` prefix. Comparison happens inside
/// `Mac::verify_slice`, which is constant time.
#[derive(Clone)]
pub struct SignatureVerifier {
  keyed: HmacSha256,
}

impl SignatureVerifier {
  pub fn new(secret: impl AsRef<[u8]>) -> PaygateResult<Self> {
    let secret = secret.as_ref();
    if secret.is_empty() {
      return Err(PaygateError::Validation("webhook secret must not be empty".to_string()));
    }
    let keyed = HmacSha256::new_from_slice(secret)
      .map_err(|e| PaygateError::Validation(format!("unusable webhook secret: {}", e)))?;
    Ok(Self { keyed })
  }

  /// Lowercase hex signature for `body`; what a well-behaved gateway would send.
  pub fn sign(&self, body: &[u8]) -> String {
    let mut mac = self.keyed.clone();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
  }

  pub fn verify(&self, body: &[u8], provided: Option<&str>) -> PaygateResult<()> {
    let provided = provided
      .map(str::trim)
      .filter(|s| !s.is_empty())
      .ok_or_else(|| PaygateError::Unauthorized("missing webhook signature".to_string()))?;
    let encoded = provided.strip_prefix("sha256=").unwrap_or(provided);
    let expected =
      hex::decode(encoded).map_err(|_| PaygateError::Unauthorized("malformed webhook signature".to_string()))?;

    let mut mac = self.keyed.clone();
    mac.update(body);
    mac
      .verify_slice(&expected)
      .map_err(|_| PaygateError::Unauthorized("webhook signature mismatch".to_string()))
  }
}

impl fmt::Debug for SignatureVerifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("SignatureVerifier([REDACTED])")
  }
}
