pub mod compression;
pub mod content_encryption;
pub mod key_management;
pub mod signature;

pub use compression::CompressionAlgorithm;
pub use content_encryption::ContentEncryptionAlgorithm;
pub use key_management::KeyManagementAlgorithm;
pub use signature::SignatureAlgorithm;

use crate::{
  error::{JoseError, JoseResult},
  secret_key::{AsymmetricKeyKind, AsymmetricSecretKey, SecretKey, SymmetricSecretKey},
};

/// Kind of key material an algorithm operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
  /// No key at all (the `none` signature algorithm)
  None,
  /// Raw symmetric bytes or a password
  Symmetric,
  Rsa,
  EllipticCurve,
  /// Ed25519 octet key pair
  OctetKeyPair,
}

/* -------------------------------- */
/// One legal range of key sizes.
///
/// `step == 0` means the range admits exactly `min`; otherwise every size
/// with `min <= size <= max` and `(size - min) % step == 0` is legal.
/// Units are bits for key-encryption keys and bytes where documented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySizeRange {
  pub min: u32,
  pub max: u32,
  pub step: u32,
}

impl KeySizeRange {
  pub const fn exact(size: u32) -> Self {
    Self {
      min: size,
      max: size,
      step: 0,
    }
  }

  pub const fn stepped(min: u32, max: u32, step: u32) -> Self {
    Self { min, max, step }
  }

  pub fn contains(&self, size: u32) -> bool {
    if self.step == 0 {
      return size == self.min;
    }
    size >= self.min && size <= self.max && (size - self.min) % self.step == 0
  }
}

/// True when `size` falls in any of the given ranges
pub fn is_legal_size(ranges: &[KeySizeRange], size: u32) -> bool {
  ranges.iter().any(|r| r.contains(size))
}

/// Reject a key whose size is outside the algorithm's declared ranges.
/// An empty range list means the algorithm has no size constraint.
pub(crate) fn validate_key_size(code: &str, ranges: &[KeySizeRange], size_bits: u32) -> JoseResult<()> {
  if ranges.is_empty() || is_legal_size(ranges, size_bits) {
    return Ok(());
  }
  Err(JoseError::InvalidKey(format!(
    "Key size {size_bits} bits is not legal for algorithm {code}"
  )))
}

/* -------------------------------- */
/* key-type guards shared by the algorithm families */

pub(crate) fn symmetric_key<'k>(code: &str, key: &'k SecretKey) -> JoseResult<&'k SymmetricSecretKey> {
  match key {
    SecretKey::Symmetric(k) => Ok(k),
    SecretKey::Asymmetric(_) => Err(JoseError::InvalidKey(format!(
      "Algorithm {code} requires a symmetric key"
    ))),
  }
}

pub(crate) fn rsa_key<'k>(code: &str, key: &'k SecretKey) -> JoseResult<&'k AsymmetricSecretKey> {
  match key {
    SecretKey::Asymmetric(k) if k.kind() == AsymmetricKeyKind::Rsa => Ok(k),
    _ => Err(JoseError::InvalidKey(format!("Algorithm {code} requires an RSA key"))),
  }
}

pub(crate) fn ec_key<'k>(code: &str, key: &'k SecretKey) -> JoseResult<&'k AsymmetricSecretKey> {
  match key {
    SecretKey::Asymmetric(k) if matches!(k.kind(), AsymmetricKeyKind::Ec(_)) => Ok(k),
    _ => Err(JoseError::InvalidKey(format!("Algorithm {code} requires an EC key"))),
  }
}

pub(crate) fn okp_key<'k>(code: &str, key: &'k SecretKey) -> JoseResult<&'k AsymmetricSecretKey> {
  match key {
    SecretKey::Asymmetric(k) if k.kind() == AsymmetricKeyKind::Ed25519 => Ok(k),
    _ => Err(JoseError::InvalidKey(format!(
      "Algorithm {code} requires an Ed25519 key"
    ))),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stepped_range() {
    let ranges = [KeySizeRange::stepped(8, u32::MAX, 8)];
    assert!(is_legal_size(&ranges, 128));
    assert!(!is_legal_size(&ranges, 130));
    assert!(!is_legal_size(&ranges, 4));
  }

  #[test]
  fn exact_range() {
    let ranges = [KeySizeRange::exact(256)];
    assert!(is_legal_size(&ranges, 256));
    assert!(!is_legal_size(&ranges, 255));
    assert!(!is_legal_size(&ranges, 257));
  }

  #[test]
  fn step_is_anchored_at_min() {
    let ranges = [KeySizeRange::stepped(2048, 16384, 8)];
    assert!(is_legal_size(&ranges, 2048));
    assert!(is_legal_size(&ranges, 3072));
    assert!(!is_legal_size(&ranges, 2049));
    assert!(!is_legal_size(&ranges, 16392));
  }
}
