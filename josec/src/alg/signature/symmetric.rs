use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;

use super::SignatureAlgorithm;
use crate::error::{JoseError, JoseResult};

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Compute the keyed-hash signature for an HS* algorithm
pub(super) fn sign(alg: SignatureAlgorithm, key: &[u8], input: &[u8]) -> JoseResult<Vec<u8>> {
  let mac = match alg {
    SignatureAlgorithm::Hs256 => {
      let mut mac = HmacSha256::new_from_slice(key).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
      mac.update(input);
      mac.finalize().into_bytes().to_vec()
    }
    SignatureAlgorithm::Hs384 => {
      let mut mac = HmacSha384::new_from_slice(key).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
      mac.update(input);
      mac.finalize().into_bytes().to_vec()
    }
    SignatureAlgorithm::Hs512 => {
      let mut mac = HmacSha512::new_from_slice(key).map_err(|e| JoseError::InvalidKey(e.to_string()))?;
      mac.update(input);
      mac.finalize().into_bytes().to_vec()
    }
    _ => unreachable!("not a keyed-hash algorithm"),
  };
  Ok(mac)
}

/// Verify by recomputation and constant-time comparison
pub(super) fn verify(alg: SignatureAlgorithm, key: &[u8], input: &[u8], signature: &[u8]) -> JoseResult<()> {
  let expected = sign(alg, key, input)?;
  if expected.ct_eq(signature).into() {
    Ok(())
  } else {
    Err(JoseError::IntegrityFailure)
  }
}
