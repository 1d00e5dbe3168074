use std::sync::Arc;

use crate::{
  alg::{CompressionAlgorithm, ContentEncryptionAlgorithm, KeyManagementAlgorithm, SignatureAlgorithm},
  error::{JoseError, JoseResult},
  registry::AlgorithmCollection,
  secret_key::{SecretKey, SecretKeyCollection},
  trace::*,
};

/// A signature algorithm paired with a key that satisfies its constraints
#[derive(Debug, Clone)]
pub struct SigningCredentials {
  pub key: Arc<SecretKey>,
  pub algorithm: SignatureAlgorithm,
}

/// Key management, content encryption and compression algorithms paired with
/// a key that satisfies the key-management constraints
#[derive(Debug, Clone)]
pub struct EncryptingCredentials {
  pub key: Arc<SecretKey>,
  pub key_management: KeyManagementAlgorithm,
  pub content_encryption: ContentEncryptionAlgorithm,
  pub compression: CompressionAlgorithm,
}

/// Pick the first signing combination satisfying the caller's allow-list.
///
/// Iteration order is deterministic: allow-list order outermost, then key
/// collection insertion order. The first code that is enabled in the registry
/// and has at least one key passing its type/size checks wins.
pub fn select_signing_credentials(
  algorithms: &AlgorithmCollection,
  allowed_codes: &[&str],
  keys: &SecretKeyCollection,
) -> JoseResult<SigningCredentials> {
  for code in allowed_codes {
    let Some(algorithm) = algorithms.signature(code) else {
      continue;
    };
    for key in keys.iter() {
      if algorithm.validate_key(key).is_ok() {
        debug!(alg = algorithm.code(), "selected signing credentials");
        return Ok(SigningCredentials {
          key: key.clone(),
          algorithm,
        });
      }
    }
  }
  warn!("no signing credentials matched the allow-list");
  Err(JoseError::NoCredentialsFound)
}

/// Pick the first encrypting combination satisfying the caller's allow-lists.
///
/// Order: key-management allow-list outermost, then the content-encryption
/// allow-list, then key collection insertion order. `dir` additionally
/// requires the key size to match the chosen content encryption exactly.
/// An empty compression allow-list selects the identity transform.
pub fn select_encrypting_credentials(
  algorithms: &AlgorithmCollection,
  allowed_key_management: &[&str],
  allowed_content_encryption: &[&str],
  allowed_compression: &[&str],
  keys: &SecretKeyCollection,
) -> JoseResult<EncryptingCredentials> {
  let compression = select_compression(algorithms, allowed_compression);

  for alg_code in allowed_key_management {
    let Some(key_management) = algorithms.key_management(alg_code) else {
      continue;
    };
    for enc_code in allowed_content_encryption {
      let Some(content_encryption) = algorithms.content_encryption(enc_code) else {
        continue;
      };
      for key in keys.iter() {
        if key_management.validate_key(key).is_err() {
          continue;
        }
        if key_management == KeyManagementAlgorithm::Dir
          && key.key_size_bits() as usize != content_encryption.content_key_size_bytes() * 8
        {
          continue;
        }
        debug!(
          alg = key_management.code(),
          enc = content_encryption.code(),
          "selected encrypting credentials"
        );
        return Ok(EncryptingCredentials {
          key: key.clone(),
          key_management,
          content_encryption,
          compression,
        });
      }
    }
  }
  warn!("no encrypting credentials matched the allow-lists");
  Err(JoseError::NoCredentialsFound)
}

/// First enabled code wins; an empty or exhausted list means no compression
fn select_compression(algorithms: &AlgorithmCollection, allowed: &[&str]) -> CompressionAlgorithm {
  allowed
    .iter()
    .find_map(|code| algorithms.compression(code))
    .unwrap_or(CompressionAlgorithm::Identity)
}
